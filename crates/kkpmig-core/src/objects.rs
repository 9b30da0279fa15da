//! Kubernetes-object-shaped output documents
//!
//! Every document the migration emits is one of the typed objects below,
//! serialized as `apiVersion`/`kind`/`metadata`/`spec` (or `data`) YAML.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::KubermaticConfiguration;
use crate::error::Result;
use crate::seed::Seed;

/// API group/version of the `KubermaticConfiguration` resource.
pub const OPERATOR_API_VERSION: &str = "operator.kubermatic.io/v1alpha1";

/// API group/version of the `Seed` and `Preset` resources.
pub const KUBERMATIC_API_VERSION: &str = "kubermatic.k8s.io/v1";

/// Annotation that tells the operator to leave an object alone.
///
/// Set on converted Seeds so the operator does not start reconciling a
/// half-migrated installation.
pub const SKIP_RECONCILING_ANNOTATION: &str = "kubermatic.io/skip-reconciling";

/// Object metadata, reduced to the fields the migration produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ObjectMeta {
    pub fn named(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }
}

/// A `v1/Secret`, emitted for per-seed kubeconfig credentials.
///
/// `data` values are base64-encoded, matching what the Kubernetes API
/// serializer produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

impl Secret {
    pub fn new(metadata: ObjectMeta, data: BTreeMap<String, String>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "Secret".to_string(),
            metadata,
            data,
        }
    }
}

/// A `v1/ConfigMap`, emitted for the OIDC CA bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMap {
    pub api_version: String,
    pub kind: String,
    pub metadata: ObjectMeta,
    pub data: BTreeMap<String, String>,
}

impl ConfigMap {
    pub fn new(metadata: ObjectMeta, data: BTreeMap<String, String>) -> Self {
        Self {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata,
            data,
        }
    }
}

/// A cloud-credential profile.
///
/// The `spec` block is carried verbatim from the legacy document; only the type
/// metadata and namespace are re-stamped during conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(default, skip_serializing_if = "is_null")]
    pub spec: serde_yaml::Value,
}

fn is_null(value: &serde_yaml::Value) -> bool {
    value.is_null()
}

/// One output document of a conversion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Object {
    Configuration(Box<KubermaticConfiguration>),
    ConfigMap(ConfigMap),
    Secret(Secret),
    Seed(Box<Seed>),
    Preset(Preset),
}

impl Object {
    /// Serialize a batch of objects as a `\n---\n`-separated YAML stream,
    /// preserving order. Consumers apply documents in stream order, so a
    /// Secret always precedes the Seed that references it.
    pub fn to_yaml_stream(objects: &[Object]) -> Result<String> {
        let mut documents = Vec::with_capacity(objects.len());
        for object in objects {
            documents.push(serde_yaml::to_string(object)?);
        }

        Ok(documents.join("\n---\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_serializes_k8s_shaped() {
        let secret = Secret::new(
            ObjectMeta::named("kubeconfig-eu-west", "kubermatic"),
            [("kubeconfig".to_string(), "YWJj".to_string())]
                .into_iter()
                .collect(),
        );

        let yaml = serde_yaml::to_string(&secret).unwrap();
        assert!(yaml.contains("apiVersion: v1"));
        assert!(yaml.contains("kind: Secret"));
        assert!(yaml.contains("name: kubeconfig-eu-west"));
        assert!(yaml.contains("kubeconfig: YWJj"));
    }

    #[test]
    fn test_yaml_stream_separates_documents() {
        let objects = vec![
            Object::ConfigMap(ConfigMap::new(
                ObjectMeta::named("ca-bundle", "kubermatic"),
                BTreeMap::new(),
            )),
            Object::ConfigMap(ConfigMap::new(
                ObjectMeta::named("other", "kubermatic"),
                BTreeMap::new(),
            )),
        ];

        let stream = Object::to_yaml_stream(&objects).unwrap();
        assert_eq!(stream.matches("---").count(), 1);
        assert!(stream.contains("name: ca-bundle"));
        assert!(stream.contains("name: other"));
    }
}
