//! The `Seed` resource
//!
//! A seed is a managed cluster hosting control planes for tenant clusters.
//! Converted seeds carry the datacenters that were grouped under them in the
//! legacy `datacenters.yaml` and, when a global kubeconfig was supplied, a
//! reference to a credential Secret emitted in the same batch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ExposeStrategy;
use crate::objects::{ObjectMeta, KUBERMATIC_API_VERSION};
use crate::resources::ResourceRequirements;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seed {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: SeedSpec,
}

impl Seed {
    pub fn named(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: KUBERMATIC_API_VERSION.to_string(),
            kind: "Seed".to_string(),
            metadata: ObjectMeta::named(name, namespace),
            spec: SeedSpec::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    /// Reference to the Secret holding this seed's kubeconfig. A non-`None`
    /// reference requires a matching Secret in the same output batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<KubeconfigReference>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub datacenters: BTreeMap<String, Datacenter>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_dns_overwrite: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_strategy: Option<ExposeStrategy>,

    #[serde(default, skip_serializing_if = "NodeportProxyConfig::is_empty")]
    pub nodeport_proxy: NodeportProxyConfig,
}

/// Pointer at a Secret field holding a serialized kubeconfig.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigReference {
    pub name: String,
    pub namespace: String,
    pub field_path: String,
}

/// One datacenter hosted by a seed.
///
/// The provider-specific `spec` is carried as-is from the legacy document;
/// this engine never interprets provider fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub country: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,

    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub spec: serde_yaml::Value,

    #[serde(default, skip_serializing_if = "serde_yaml::Value::is_null")]
    pub node: serde_yaml::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeportProxyConfig {
    #[serde(default, skip_serializing_if = "NodeportProxyComponent::is_empty")]
    pub envoy: NodeportProxyComponent,

    #[serde(default, skip_serializing_if = "NodeportProxyComponent::is_empty")]
    pub envoy_manager: NodeportProxyComponent,

    #[serde(default, skip_serializing_if = "NodeportProxyComponent::is_empty")]
    pub updater: NodeportProxyComponent,

    /// Annotations for the nodeport proxy's LoadBalancer service.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl NodeportProxyConfig {
    pub fn is_empty(&self) -> bool {
        self.envoy.is_empty()
            && self.envoy_manager.is_empty()
            && self.updater.is_empty()
            && self.annotations.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeportProxyComponent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

impl NodeportProxyComponent {
    pub fn is_empty(&self) -> bool {
        self.docker_repository.is_empty() && self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_seed_spec_stays_small() {
        let seed = Seed::named("eu-west", "kubermatic");
        let yaml = serde_yaml::to_string(&seed).unwrap();

        assert!(yaml.contains("kind: Seed"));
        assert!(!yaml.contains("nodeportProxy"));
        assert!(!yaml.contains("kubeconfig"));
    }

    #[test]
    fn test_kubeconfig_reference_roundtrip() {
        let mut seed = Seed::named("eu-west", "kubermatic");
        seed.spec.kubeconfig = Some(KubeconfigReference {
            name: "kubeconfig-eu-west".to_string(),
            namespace: "kubermatic".to_string(),
            field_path: "kubeconfig".to_string(),
        });

        let yaml = serde_yaml::to_string(&seed).unwrap();
        assert!(yaml.contains("fieldPath: kubeconfig"));

        let parsed: Seed = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.spec.kubeconfig, seed.spec.kubeconfig);
    }
}
