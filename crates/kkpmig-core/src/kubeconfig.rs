//! Kubeconfig model and per-seed splitting
//!
//! Admins of the legacy platform kept one big kubeconfig with a context
//! per seed cluster. Each converted Seed instead references a Secret
//! holding a minimal kubeconfig with exactly that seed's credentials.
//!
//! The cluster and user blobs are carried as opaque YAML so exotic auth
//! plugins and future fields survive the split untouched.

use base64::prelude::{Engine, BASE64_STANDARD};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::objects::{ObjectMeta, Secret};
use crate::seed::KubeconfigReference;

/// The Secret data key and Seed field path under which the kubeconfig
/// is stored.
pub const KUBECONFIG_FIELD_PATH: &str = "kubeconfig";

/// A `v1/Config` kubeconfig, as written by kubectl and client libraries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clusters: Vec<NamedCluster>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<NamedContext>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users: Vec<NamedAuthInfo>,

    #[serde(rename = "current-context", default, skip_serializing_if = "String::is_empty")]
    pub current_context: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: serde_yaml::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    pub context: Context,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub cluster: String,
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedAuthInfo {
    pub name: String,
    pub user: serde_yaml::Value,
}

impl Kubeconfig {
    pub fn from_yaml(data: &[u8]) -> Result<Self> {
        Ok(serde_yaml::from_slice(data)?)
    }

    /// Extract a self-contained kubeconfig for the context named after
    /// the given seed.
    ///
    /// The result has exactly one cluster, context and user, with the
    /// context pre-selected. Fails with a [`CoreError::NotFound`] naming
    /// the missing item if the context, its cluster or its user does not
    /// exist.
    pub fn split_for_seed(&self, seed_name: &str) -> Result<Kubeconfig> {
        let context = self
            .contexts
            .iter()
            .find(|c| c.name == seed_name)
            .ok_or_else(|| CoreError::NotFound {
                kind: "context",
                name: seed_name.to_string(),
            })?;

        let cluster = self
            .clusters
            .iter()
            .find(|c| c.name == context.context.cluster)
            .ok_or_else(|| CoreError::NotFound {
                kind: "cluster",
                name: context.context.cluster.clone(),
            })?;

        let user = self
            .users
            .iter()
            .find(|u| u.name == context.context.user)
            .ok_or_else(|| CoreError::NotFound {
                kind: "user",
                name: context.context.user.clone(),
            })?;

        Ok(Kubeconfig {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            clusters: vec![cluster.clone()],
            contexts: vec![context.clone()],
            users: vec![user.clone()],
            current_context: seed_name.to_string(),
        })
    }
}

/// Wrap a single-seed kubeconfig in a Secret and build the reference a
/// Seed uses to point at it.
pub fn secret_for_seed(
    seed_name: &str,
    namespace: &str,
    kubeconfig: &Kubeconfig,
) -> Result<(Secret, KubeconfigReference)> {
    let yaml = serde_yaml::to_string(kubeconfig)?;

    let secret_name = format!("kubeconfig-{seed_name}");
    let mut data = std::collections::BTreeMap::new();
    data.insert(
        KUBECONFIG_FIELD_PATH.to_string(),
        BASE64_STANDARD.encode(yaml.as_bytes()),
    );

    let secret = Secret::new(ObjectMeta::named(&secret_name, namespace), data);
    let reference = KubeconfigReference {
        name: secret_name,
        namespace: namespace.to_string(),
        field_path: KUBECONFIG_FIELD_PATH.to_string(),
    };

    Ok((secret, reference))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
- name: europe-west3-c
  cluster:
    server: https://seed.example.com:6443
    certificate-authority-data: dGVzdA==
- name: us-east1-b
  cluster:
    server: https://other.example.com:6443
contexts:
- name: europe-west3-c
  context:
    cluster: europe-west3-c
    user: europe-west3-c
- name: us-east1-b
  context:
    cluster: us-east1-b
    user: us-east1-b
- name: dangling
  context:
    cluster: no-such-cluster
    user: us-east1-b
users:
- name: europe-west3-c
  user:
    token: sometoken
- name: us-east1-b
  user:
    client-certificate-data: dGVzdA==
current-context: europe-west3-c
"#;

    #[test]
    fn test_split_for_seed() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG.as_bytes()).unwrap();
        let split = kubeconfig.split_for_seed("us-east1-b").unwrap();

        assert_eq!(split.clusters.len(), 1);
        assert_eq!(split.contexts.len(), 1);
        assert_eq!(split.users.len(), 1);
        assert_eq!(split.current_context, "us-east1-b");
        assert_eq!(split.clusters[0].name, "us-east1-b");
        assert_eq!(split.users[0].user["client-certificate-data"], "dGVzdA==");
    }

    #[test]
    fn test_split_unknown_context() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG.as_bytes()).unwrap();
        let err = kubeconfig.split_for_seed("asia-south1").unwrap_err();

        assert!(matches!(err, CoreError::NotFound { kind: "context", .. }));
        assert!(err.to_string().contains("asia-south1"));
    }

    #[test]
    fn test_split_dangling_cluster() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG.as_bytes()).unwrap();
        let err = kubeconfig.split_for_seed("dangling").unwrap_err();

        assert!(matches!(err, CoreError::NotFound { kind: "cluster", .. }));
    }

    #[test]
    fn test_secret_for_seed() {
        let kubeconfig = Kubeconfig::from_yaml(KUBECONFIG.as_bytes()).unwrap();
        let split = kubeconfig.split_for_seed("europe-west3-c").unwrap();
        let (secret, reference) = secret_for_seed("europe-west3-c", "kubermatic", &split).unwrap();

        assert_eq!(secret.metadata.name, "kubeconfig-europe-west3-c");
        assert_eq!(secret.metadata.namespace, "kubermatic");
        assert_eq!(reference.name, "kubeconfig-europe-west3-c");
        assert_eq!(reference.field_path, "kubeconfig");

        let encoded = &secret.data["kubeconfig"];
        let decoded = BASE64_STANDARD.decode(encoded).unwrap();
        let reparsed = Kubeconfig::from_yaml(&decoded).unwrap();
        assert_eq!(reparsed, split);
    }
}
