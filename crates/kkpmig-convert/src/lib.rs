//! Legacy Helm values to CRD converter.
//!
//! The old platform was configured through one big Helm `values.yaml`
//! with base64-embedded `datacenters.yaml`, kubeconfig and preset blobs.
//! This crate parses that legacy shape and emits the equivalent set of
//! new-style resources: a `KubermaticConfiguration`, one `Seed` plus
//! kubeconfig `Secret` per seed cluster, the CA bundle `ConfigMap` and
//! the re-stamped `Preset`s.
//!
//! Values that match a built-in default are dropped during conversion,
//! so migrated installations keep tracking defaults they never
//! customized.

pub mod converter;
pub mod datacenters;
pub mod error;
pub mod features;
pub mod values;

pub use converter::{convert, convert_datacenters, Options};
pub use datacenters::{datacenter_metas_to_seeds, DatacentersMeta};
pub use error::{ConvertError, Result};
pub use values::HelmValues;
