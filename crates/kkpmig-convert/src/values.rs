//! The legacy `values.yaml` schema
//!
//! This mirrors the flat shape of the old Helm chart's values file. It is
//! only ever deserialized; the converter reads it once and throws it away.
//! Unknown keys are ignored because real-world values files carry plenty
//! of chart-only settings (ingress annotations, nginx tuning and so on)
//! that have no counterpart in the new resources.

use kkpmig_core::ResourceRequirements;
use serde::Deserialize;

use crate::error::{ConvertError, Result};

/// Top-level wrapper; everything lives under the `kubermatic` key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HelmValues {
    #[serde(default)]
    pub kubermatic: LegacyValues,
}

/// The `kubermatic` section of the legacy values file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyValues {
    #[serde(default)]
    pub image_pull_secret_data: String,

    #[serde(default)]
    pub auth: LegacyAuth,

    /// base64-encoded `datacenters.yaml` document.
    #[serde(default)]
    pub datacenters: String,

    #[serde(default)]
    pub domain: String,

    /// base64-encoded multi-context kubeconfig for all seeds.
    #[serde(default)]
    pub kubeconfig: String,

    #[serde(default)]
    pub monitoring_scrape_annotation_prefix: String,

    #[serde(default)]
    pub kubermatic_image: String,

    #[serde(default)]
    pub dnat_controller_image: String,

    #[serde(default)]
    pub expose_strategy: String,

    /// base64-encoded preset list.
    #[serde(default)]
    pub presets: String,

    #[serde(default)]
    pub apiserver_default_replicas: Option<NumericOrString>,

    #[serde(default)]
    pub max_parallel_reconcile: Option<NumericOrString>,

    #[serde(default)]
    pub apiserver_endpoint_reconciling_disabled: bool,

    #[serde(default)]
    pub etcd: LegacyEtcd,

    #[serde(default)]
    pub controller: LegacyController,

    #[serde(default)]
    pub api: LegacyApi,

    #[serde(default)]
    pub ui: LegacyUi,

    #[serde(default)]
    pub master_controller: LegacyMasterController,

    #[serde(default)]
    pub store_container: String,

    #[serde(default)]
    pub cleanup_container: String,

    #[serde(default)]
    pub cluster_namespace_prometheus: LegacyPrometheus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAuth {
    #[serde(default, rename = "clientID")]
    pub client_id: String,

    #[serde(default)]
    pub token_issuer: String,

    #[serde(default, rename = "issuerRedirectURL")]
    pub issuer_redirect_url: String,

    #[serde(default, rename = "issuerClientID")]
    pub issuer_client_id: String,

    #[serde(default)]
    pub issuer_client_secret: String,

    #[serde(default)]
    pub issuer_cookie_key: String,

    /// base64-encoded PEM bundle for the OIDC issuer.
    #[serde(default)]
    pub ca_bundle: String,

    /// Stringly-typed bool in the legacy chart ("true"/"false").
    #[serde(default, rename = "skipTokenIssuerTLSVerify")]
    pub skip_token_issuer_tls_verify: String,

    #[serde(default)]
    pub service_account_key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyEtcd {
    #[serde(default)]
    pub disk_size: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyController {
    #[serde(default)]
    pub feature_gates: String,

    #[serde(default)]
    pub nodeport_range: String,

    #[serde(default)]
    pub replicas: Option<NumericOrString>,

    #[serde(default)]
    pub image: DockerImage,

    #[serde(default)]
    pub pprof_endpoint: String,

    #[serde(default)]
    pub addons: LegacyAddons,

    #[serde(default)]
    pub overwrite_registry: String,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAddons {
    #[serde(default)]
    pub kubernetes: AddonValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonValues {
    #[serde(default)]
    pub default_addons: Vec<String>,

    #[serde(default)]
    pub default_addons_file: String,

    #[serde(default)]
    pub image: DockerImage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyApi {
    #[serde(default)]
    pub feature_gates: String,

    #[serde(default)]
    pub replicas: Option<NumericOrString>,

    #[serde(default)]
    pub accessible_addons: Vec<String>,

    #[serde(default)]
    pub image: DockerImage,

    #[serde(default)]
    pub pprof_endpoint: String,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyUi {
    #[serde(default)]
    pub replicas: Option<NumericOrString>,

    #[serde(default)]
    pub image: DockerImage,

    #[serde(default)]
    pub config: String,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMasterController {
    #[serde(default)]
    pub replicas: Option<NumericOrString>,

    #[serde(default)]
    pub image: DockerImage,

    #[serde(default)]
    pub pprof_endpoint: String,

    #[serde(default)]
    pub resources: ResourceRequirements,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyPrometheus {
    #[serde(default)]
    pub disable_default_scraping_configs: bool,

    #[serde(default)]
    pub scraping_configs: Option<serde_yaml::Value>,

    #[serde(default)]
    pub disable_default_rules: bool,

    #[serde(default)]
    pub rules: Option<serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerImage {
    #[serde(default)]
    pub repository: String,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub pull_policy: String,
}

/// A YAML value that legacy charts wrote either as an integer or as a
/// quoted string, e.g. `replicas: 2` vs `replicas: "2"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NumericOrString {
    Number(i64),
    String(String),
}

impl NumericOrString {
    /// Coerce to an integer; anything non-numeric is an error.
    pub fn as_i32(&self) -> Result<i32> {
        match self {
            NumericOrString::Number(value) => {
                i32::try_from(*value).map_err(|_| ConvertError::InvalidNumber {
                    value: value.to_string(),
                })
            }
            NumericOrString::String(value) => {
                value
                    .trim()
                    .parse()
                    .map_err(|_| ConvertError::InvalidNumber {
                        value: value.clone(),
                    })
            }
        }
    }

    /// An empty string counts as "not set".
    pub fn is_unset(&self) -> bool {
        matches!(self, NumericOrString::String(value) if value.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_or_string_coercion() {
        assert_eq!(NumericOrString::Number(7).as_i32().unwrap(), 7);
        assert_eq!(
            NumericOrString::String("7".to_string()).as_i32().unwrap(),
            7
        );
        assert!(NumericOrString::String("seven".to_string()).as_i32().is_err());
    }

    #[test]
    fn test_replicas_accept_both_yaml_shapes() {
        let values: LegacyApi = serde_yaml::from_str("replicas: 3").unwrap();
        assert_eq!(values.replicas, Some(NumericOrString::Number(3)));

        let values: LegacyApi = serde_yaml::from_str("replicas: \"3\"").unwrap();
        assert_eq!(
            values.replicas,
            Some(NumericOrString::String("3".to_string()))
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let yaml = r#"
kubermatic:
  domain: kkp.example.com
  checks: {}
  nginx:
    replicas: 3
"#;
        let values: HelmValues = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(values.kubermatic.domain, "kkp.example.com");
    }

    #[test]
    fn test_auth_section_field_names() {
        let yaml = r#"
clientID: kubermatic
issuerRedirectURL: https://kkp.example.com/api/v1/kubeconfig
issuerClientID: kubermaticIssuer
skipTokenIssuerTLSVerify: "true"
serviceAccountKey: abcdef
"#;
        let auth: LegacyAuth = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(auth.client_id, "kubermatic");
        assert_eq!(auth.issuer_client_id, "kubermaticIssuer");
        assert_eq!(auth.skip_token_issuer_tls_verify, "true");
        assert_eq!(auth.service_account_key, "abcdef");
    }
}
