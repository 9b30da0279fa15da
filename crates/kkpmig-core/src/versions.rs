//! Supported Kubernetes versions, upgrade rules and provider incompatibilities

use semver::Version;
use serde::{Deserialize, Serialize};

/// The version matrix of an installation.
///
/// Invariants (checked by the tests at the bottom of this module for the
/// built-in matrix, and expected of any hand-authored one):
/// - `default` is a member of `versions`
/// - every update with `automatic` set lands exactly on a member of
///   `versions`, otherwise clusters would be forced onto an unsupported
///   release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersioningConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Version>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub versions: Vec<Version>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<Update>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_incompatibilities: Vec<Incompatibility>,
}

impl VersioningConfiguration {
    /// Whether nothing at all was configured. Versioning is defaulted
    /// all-or-nothing, so a single missing piece counts as unset.
    pub fn is_incomplete(&self) -> bool {
        self.default.is_none()
            || self.versions.is_empty()
            || self.updates.is_empty()
            || self.provider_incompatibilities.is_empty()
    }
}

/// One allowed upgrade path.
///
/// `from` and `to` are semver ranges (`1.21.*`, `>= 1.21.0, < 1.21.8`).
/// With `automatic` set, clusters matching `from` are upgraded to `to`
/// without operator interaction; `to` must then be an exact version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub from: String,
    pub to: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub automatic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Always,
    ExternalCloudProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Create,
    Update,
    Support,
}

/// A version range a given cloud provider cannot run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incompatibility {
    pub provider: String,
    pub version: String,
    pub condition: Condition,
    pub operation: Operation,
}

#[cfg(test)]
mod tests {
    use crate::defaults::DefaultTables;

    use super::*;

    #[test]
    fn test_default_version_is_supported() {
        let matrix = &DefaultTables::get().kubernetes_versioning;
        let default = matrix.default.as_ref().expect("matrix has a default");

        assert!(
            matrix.versions.contains(default),
            "default version {default} is not in the supported versions list"
        );
    }

    #[test]
    fn test_automatic_update_rules_match_versions() {
        let matrix = &DefaultTables::get().kubernetes_versioning;

        for update in matrix.updates.iter().filter(|u| u.automatic) {
            let target: Version = update
                .to
                .parse()
                .unwrap_or_else(|_| panic!("automatic update target '{}' is not an exact version", update.to));

            assert!(
                matrix.versions.contains(&target),
                "automatic update {} -> {} does not land on a supported version",
                update.from,
                update.to
            );
        }
    }

    #[test]
    fn test_incomplete_detection() {
        let mut matrix = VersioningConfiguration::default();
        assert!(matrix.is_incomplete());

        matrix = DefaultTables::get().kubernetes_versioning.clone();
        assert!(!matrix.is_incomplete());

        matrix.updates.clear();
        assert!(matrix.is_incomplete());
    }

    #[test]
    fn test_update_serializes_automatic_only_when_set() {
        let manual = Update {
            from: "1.21.*".to_string(),
            to: "1.22.*".to_string(),
            automatic: false,
        };
        let yaml = serde_yaml::to_string(&manual).unwrap();
        assert!(!yaml.contains("automatic"));

        let automatic = Update {
            automatic: true,
            ..manual
        };
        let yaml = serde_yaml::to_string(&automatic).unwrap();
        assert!(yaml.contains("automatic: true"));
    }
}
