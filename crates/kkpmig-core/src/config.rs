//! The normalized `KubermaticConfiguration` schema
//!
//! This is the CRD-shaped counterpart of the legacy flat Helm values. Every
//! leaf is either a default-eligible scalar (empty string / `None` / zero
//! means "use the built-in default"), a [`ResourceRequirements`] pair or an
//! optional replica count. Fields at their zero value are skipped during
//! serialization so an elided field is truly absent from the document.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::objects::{ObjectMeta, OPERATOR_API_VERSION};
use crate::resources::ResourceRequirements;
use crate::versions::VersioningConfiguration;

/// How tenant-cluster API servers are exposed outside the seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExposeStrategy {
    NodePort,
    LoadBalancer,
    Tunneling,
}

impl ExposeStrategy {
    pub const ALL: [ExposeStrategy; 3] = [
        ExposeStrategy::NodePort,
        ExposeStrategy::LoadBalancer,
        ExposeStrategy::Tunneling,
    ];
}

impl fmt::Display for ExposeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NodePort => "NodePort",
            Self::LoadBalancer => "LoadBalancer",
            Self::Tunneling => "Tunneling",
        };
        f.write_str(name)
    }
}

impl FromStr for ExposeStrategy {
    type Err = CoreError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "NodePort" => Ok(Self::NodePort),
            "LoadBalancer" => Ok(Self::LoadBalancer),
            "Tunneling" => Ok(Self::Tunneling),
            other => Err(CoreError::invalid_config(format!(
                "invalid expose strategy '{other}', choose one of NodePort, LoadBalancer, Tunneling"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubermaticConfiguration {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default)]
    pub spec: KubermaticConfigurationSpec,
}

impl KubermaticConfiguration {
    /// An empty configuration with type metadata stamped.
    pub fn named(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: OPERATOR_API_VERSION.to_string(),
            kind: "KubermaticConfiguration".to_string(),
            metadata: ObjectMeta::named(name, namespace),
            spec: KubermaticConfigurationSpec::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubermaticConfigurationSpec {
    #[serde(default, skip_serializing_if = "is_default")]
    pub ingress: IngressConfiguration,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image_pull_secret: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expose_strategy: Option<ExposeStrategy>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub ca_bundle: CaBundleReference,

    #[serde(default, skip_serializing_if = "is_default")]
    pub auth: AuthConfiguration,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub feature_gates: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "is_default")]
    pub api: ApiConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub seed_controller: SeedControllerConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub master_controller: MasterControllerConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub user_cluster: UserClusterConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub ui: UiConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub versions: VersioningConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub vertical_pod_autoscaler: VerticalPodAutoscalerConfiguration,
}

fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngressConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub class_name: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub certificate_issuer: CertificateIssuer,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateIssuer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

/// Reference to the ConfigMap holding the platform CA bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaBundleReference {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub client_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_issuer: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_client_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_redirect_url: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_client_secret: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub issuer_cookie_key: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account_key: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_token_issuer_tls_verify: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub accessible_addons: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pprof_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedControllerConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub maximum_parallel_reconciles: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub backup_store_container: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub backup_cleanup_container: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub backup_delete_container: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub backup_restore: BackupRestoreConfiguration,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pprof_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

/// Settings for the restic-based backup/restore mechanism.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRestoreConfiguration {
    #[serde(default, skip_serializing_if = "is_false")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_endpoint: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub s3_bucket_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterControllerConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pprof_endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClusterConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kubermatic_docker_repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dnat_controller_docker_repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_launcher_docker_repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub overwrite_registry: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub node_port_range: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub etcd_volume_size: String,

    #[serde(default, skip_serializing_if = "is_default")]
    pub addons: AddonsConfiguration,

    #[serde(default, skip_serializing_if = "is_default")]
    pub monitoring: UserClusterMonitoringConfiguration,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_api_server_endpoint_reconciling: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apiserver_replicas: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonsConfiguration {
    #[serde(default, skip_serializing_if = "is_default")]
    pub kubernetes: AddonConfiguration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_manifests: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClusterMonitoringConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scrape_annotation_prefix: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_default_rules: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disable_default_scraping_configs: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_rules: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub custom_scraping_configs: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiConfiguration {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerticalPodAutoscalerConfiguration {
    #[serde(default, skip_serializing_if = "is_default")]
    pub recommender: VpaComponent,

    #[serde(default, skip_serializing_if = "is_default")]
    pub updater: VpaComponent,

    #[serde(default, skip_serializing_if = "is_default")]
    pub admission_controller: VpaComponent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VpaComponent {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub docker_repository: String,

    #[serde(default, skip_serializing_if = "ResourceRequirements::is_empty")]
    pub resources: ResourceRequirements,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expose_strategy_roundtrip() {
        for strategy in ExposeStrategy::ALL {
            let parsed: ExposeStrategy = strategy.to_string().parse().unwrap();
            assert_eq!(parsed, strategy);
        }

        assert!("HostNetwork".parse::<ExposeStrategy>().is_err());
    }

    #[test]
    fn test_empty_spec_serializes_empty() {
        let config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("apiVersion: operator.kubermatic.io/v1alpha1"));
        assert!(yaml.contains("kind: KubermaticConfiguration"));
        // no sub-section should appear for an all-default spec
        assert!(!yaml.contains("seedController"));
        assert!(!yaml.contains("verticalPodAutoscaler"));
    }

    #[test]
    fn test_partial_spec_keeps_only_set_fields() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.ingress.domain = "kkp.example.com".to_string();
        config.spec.api.replicas = Some(5);

        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("domain: kkp.example.com"));
        assert!(yaml.contains("replicas: 5"));
        assert!(!yaml.contains("ui:"));
        assert!(!yaml.contains("dockerRepository"));
    }

    #[test]
    fn test_deserialize_hand_authored_spec() {
        let yaml = r#"
apiVersion: operator.kubermatic.io/v1alpha1
kind: KubermaticConfiguration
metadata:
  name: kubermatic
  namespace: kubermatic
spec:
  ingress:
    domain: kkp.example.com
  api:
    replicas: 3
    resources:
      requests:
        cpu: 200m
"#;

        let config: KubermaticConfiguration = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.spec.ingress.domain, "kkp.example.com");
        assert_eq!(config.spec.api.replicas, Some(3));

        let requests = config.spec.api.resources.requests.unwrap();
        assert_eq!(requests.len(), 1);
    }
}
