//! Core data model and defaulting engine for the platform migration.
//!
//! This crate defines the modern configuration resources
//! (`KubermaticConfiguration`, `Seed`, `Preset`), the built-in default
//! tables and the pure defaulting functions applied to freshly converted
//! documents. It performs no I/O; callers hand in parsed documents and
//! receive new values back.

pub mod config;
pub mod defaults;
pub mod error;
pub mod kubeconfig;
pub mod objects;
pub mod resources;
pub mod seed;
pub mod versions;

pub use config::{ExposeStrategy, KubermaticConfiguration, KubermaticConfigurationSpec};
pub use defaults::{apply_defaults, apply_seed_defaults, DefaultTables};
pub use error::{CoreError, Result};
pub use kubeconfig::Kubeconfig;
pub use objects::{ConfigMap, Object, ObjectMeta, Preset, Secret};
pub use resources::{Quantity, ResourceList, ResourceName, ResourceRequirements};
pub use seed::{Datacenter, Seed, SeedSpec};
pub use versions::VersioningConfiguration;
