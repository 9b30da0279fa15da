//! Legacy `datacenters.yaml` parsing and Seed assembly
//!
//! The legacy file is one flat map of datacenter descriptors. Entries
//! flagged `is_seed` describe seed clusters; every other entry names its
//! parent seed via the `seed` key. The new model inverts this: one Seed
//! resource per seed cluster, with its node datacenters nested inside.

use indexmap::IndexMap;
use kkpmig_core::seed::Datacenter;
use kkpmig_core::Seed;
use serde::Deserialize;

use crate::error::{ConvertError, Result};

/// The top-level document shape of `datacenters.yaml`.
///
/// An [`IndexMap`] keeps the file's author-chosen order, so converted
/// Seeds come out in the same order the datacenters were written in.
/// Parsing is strict; a typo'd key fails the conversion instead of being
/// silently dropped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatacentersMeta {
    #[serde(default)]
    pub datacenters: IndexMap<String, LegacyDatacenterMeta>,
}

/// One entry of the legacy datacenters map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyDatacenterMeta {
    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub country: String,

    /// Name of the parent seed; only meaningful when `is_seed` is false.
    #[serde(default)]
    pub seed: String,

    /// Provider-specific settings, carried over verbatim.
    #[serde(default)]
    pub spec: serde_yaml::Value,

    #[serde(default)]
    pub is_seed: bool,

    #[serde(default)]
    pub seed_dns_overwrite: Option<String>,

    #[serde(default)]
    pub node: serde_yaml::Value,
}

/// Regroup the flat legacy map into Seed resources.
///
/// Fails if a node datacenter references a seed that is not declared in
/// the same document.
pub fn datacenter_metas_to_seeds(
    metas: &IndexMap<String, LegacyDatacenterMeta>,
) -> Result<Vec<Seed>> {
    let mut seeds: IndexMap<&str, Seed> = IndexMap::new();

    for (name, meta) in metas {
        if !meta.is_seed {
            continue;
        }

        let mut seed = Seed::named(name, "");
        seed.spec.country = meta.country.clone();
        seed.spec.location = meta.location.clone();
        seed.spec.seed_dns_overwrite = meta.seed_dns_overwrite.clone();

        seeds.insert(name, seed);
    }

    for (name, meta) in metas {
        if meta.is_seed {
            continue;
        }

        let seed = seeds.get_mut(meta.seed.as_str()).ok_or_else(|| {
            ConvertError::config(format!(
                "datacenter '{name}' belongs to non-existing seed '{}'",
                meta.seed
            ))
        })?;

        seed.spec.datacenters.insert(
            name.clone(),
            Datacenter {
                country: meta.country.clone(),
                location: meta.location.clone(),
                spec: meta.spec.clone(),
                node: meta.node.clone(),
            },
        );
    }

    Ok(seeds.into_values().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATACENTERS: &str = r#"
datacenters:
  europe-west3-c:
    location: Frankfurt
    country: DE
    is_seed: true
    seed_dns_overwrite: seed.example.com
  do-ams3:
    location: Amsterdam
    country: NL
    seed: europe-west3-c
    spec:
      digitalocean:
        region: ams3
  aws-eu-central-1a:
    location: EU (Frankfurt)
    country: DE
    seed: europe-west3-c
    spec:
      aws:
        region: eu-central-1
    node:
      pause_image: docker.io/kubernetes/pause:latest
"#;

    #[test]
    fn test_seed_grouping() {
        let metas: DatacentersMeta = serde_yaml::from_str(DATACENTERS).unwrap();
        let seeds = datacenter_metas_to_seeds(&metas.datacenters).unwrap();

        assert_eq!(seeds.len(), 1);

        let seed = &seeds[0];
        assert_eq!(seed.metadata.name, "europe-west3-c");
        assert_eq!(seed.spec.country, "DE");
        assert_eq!(seed.spec.seed_dns_overwrite.as_deref(), Some("seed.example.com"));
        assert_eq!(seed.spec.datacenters.len(), 2);

        let aws = &seed.spec.datacenters["aws-eu-central-1a"];
        assert_eq!(aws.location, "EU (Frankfurt)");
        assert_eq!(aws.spec["aws"]["region"], "eu-central-1");
        assert_eq!(aws.node["pause_image"], "docker.io/kubernetes/pause:latest");
    }

    #[test]
    fn test_dangling_seed_reference() {
        let yaml = r#"
datacenters:
  do-ams3:
    seed: no-such-seed
"#;
        let metas: DatacentersMeta = serde_yaml::from_str(yaml).unwrap();
        let err = datacenter_metas_to_seeds(&metas.datacenters).unwrap_err();

        assert!(err.to_string().contains("no-such-seed"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let yaml = r#"
datacenters:
  europe-west3-c:
    location: Frankfurt
    country: DE
    is_sead: true
"#;
        assert!(serde_yaml::from_str::<DatacentersMeta>(yaml).is_err());
    }
}
