//! The legacy-values-to-CRD conversion engine
//!
//! [`convert`] turns one legacy `values.yaml` document into the full set
//! of new-style objects: the `KubermaticConfiguration`, an optional CA
//! bundle ConfigMap, one Seed (plus kubeconfig Secret) per seed cluster
//! and the re-stamped Presets.
//!
//! The engine's core invariant is value elision: a converted document
//! never carries an explicit value that equals the platform's built-in
//! default. Installations that never customized a field keep following
//! the default when it changes in a later release. [`str_if_changed`],
//! [`get_replicas`] and [`convert_resources`] all implement this rule for
//! their respective field shapes.

use base64::prelude::{Engine, BASE64_STANDARD};
use indexmap::IndexMap;
use kkpmig_core::config::{
    AddonConfiguration, ApiConfiguration, AuthConfiguration, MasterControllerConfiguration,
    SeedControllerConfiguration, UiConfiguration, UserClusterConfiguration,
};
use kkpmig_core::defaults::KUBERNETES_ADDONS_FILE_NAME;
use kkpmig_core::kubeconfig::secret_for_seed;
use kkpmig_core::objects::{KUBERMATIC_API_VERSION, SKIP_RECONCILING_ANNOTATION};
use kkpmig_core::resources::{ResourceList, ResourceName, ResourceRequirements};
use kkpmig_core::{
    ConfigMap, DefaultTables, Kubeconfig, KubermaticConfiguration, Object, ObjectMeta, Preset,
};
use serde::Deserialize;
use tracing::debug;

use crate::datacenters::{datacenter_metas_to_seeds, DatacentersMeta, LegacyDatacenterMeta};
use crate::error::{ConvertError, Result};
use crate::features::parse_feature_gates;
use crate::values::{AddonValues, HelmValues, LegacyValues, NumericOrString};

/// Data key of the emitted CA bundle ConfigMap.
pub const CA_BUNDLE_KEY: &str = "ca-bundle.pem";

/// Knobs for one conversion run.
#[derive(Debug, Clone)]
pub struct Options {
    /// Namespace stamped onto every emitted object.
    pub namespace: String,

    /// Convert the embedded `datacenters` blob into Seeds.
    pub include_seeds: bool,

    /// Convert the embedded `presets` blob.
    pub include_presets: bool,

    /// Annotate Seeds so the operator ignores them until the migration
    /// is reviewed.
    pub pause_seeds: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            namespace: "kubermatic".to_string(),
            include_seeds: true,
            include_presets: true,
            pause_seeds: true,
        }
    }
}

/// Convert a legacy `values.yaml` document into the new object graph.
///
/// The output order is fixed: configuration first, then the CA bundle
/// ConfigMap if one exists, then for each seed its kubeconfig Secret
/// immediately followed by the Seed, then all Presets. Consumers apply
/// documents in stream order, so references always point backwards.
pub fn convert(yaml: &[u8], options: &Options, tables: &DefaultTables) -> Result<Vec<Object>> {
    let values: HelmValues =
        serde_yaml::from_slice(yaml).map_err(|source| ConvertError::Yaml {
            context: "values.yaml",
            source,
        })?;
    let values = &values.kubermatic;

    let mut objects = Vec::new();

    let (config, ca_bundle) = convert_configuration(values, &options.namespace, tables)?;
    objects.push(Object::Configuration(Box::new(config)));

    if let Some(config_map) = ca_bundle {
        objects.push(Object::ConfigMap(config_map));
    }

    if options.include_seeds {
        objects.extend(convert_seeds(values, options)?);
    }

    if options.include_presets {
        objects.extend(convert_presets(values, &options.namespace)?);
    }

    debug!(objects = objects.len(), "conversion finished");

    Ok(objects)
}

fn convert_configuration(
    values: &LegacyValues,
    namespace: &str,
    tables: &DefaultTables,
) -> Result<(KubermaticConfiguration, Option<ConfigMap>)> {
    let mut config = KubermaticConfiguration::named("kubermatic", namespace);
    let spec = &mut config.spec;

    spec.ingress.domain = values.domain.clone();

    // Not actually a platform default, but every legacy installation runs
    // the stock cert-manager chart which ships this ClusterIssuer. The
    // kind stays unset; ClusterIssuer is the built-in default.
    spec.ingress.certificate_issuer.name = "letsencrypt-prod".to_string();

    if !values.expose_strategy.is_empty() {
        let strategy = values
            .expose_strategy
            .parse()
            .map_err(|err| ConvertError::config(format!("{err}")))?;
        spec.expose_strategy = str_if_changed_value(strategy, tables.expose_strategy);
    }

    let pull_secret = decode_base64("imagePullSecretData", &values.image_pull_secret_data)?;
    spec.image_pull_secret = into_utf8("imagePullSecretData", pull_secret)?;

    spec.auth = convert_auth(values, tables)?;

    // The CA bundle ConfigMap is emitted under the default name, so the
    // caBundle reference stays unset and defaulting fills it in.
    let ca_bundle = convert_ca_bundle(values, namespace)?;

    spec.feature_gates = convert_feature_gates(values)?;
    spec.api = convert_api(values, tables)?;
    spec.seed_controller = convert_seed_controller(values, tables)?;
    spec.user_cluster = convert_user_cluster(values, tables)?;
    spec.master_controller = convert_master_controller(values, tables)?;
    spec.ui = convert_ui(values, tables)?;

    Ok((config, ca_bundle))
}

fn convert_auth(values: &LegacyValues, tables: &DefaultTables) -> Result<AuthConfiguration> {
    let auth = &values.auth;

    let mut effective_client_id = auth.client_id.as_str();
    if effective_client_id.is_empty() {
        effective_client_id = &tables.auth_client_id;
    }

    Ok(AuthConfiguration {
        client_id: str_if_changed(&auth.client_id, &tables.auth_client_id),
        token_issuer: str_if_changed(
            &auth.token_issuer,
            &format!("https://{}/dex", values.domain),
        ),
        issuer_client_id: str_if_changed(
            &auth.issuer_client_id,
            &format!("{effective_client_id}Issuer"),
        ),
        issuer_redirect_url: str_if_changed(
            &auth.issuer_redirect_url,
            &format!("https://{}/api/v1/kubeconfig", values.domain),
        ),
        issuer_client_secret: auth.issuer_client_secret.clone(),
        issuer_cookie_key: auth.issuer_cookie_key.clone(),
        service_account_key: auth.service_account_key.clone(),
        skip_token_issuer_tls_verify: auth.skip_token_issuer_tls_verify == "true",
    })
}

/// The legacy chart embedded the OIDC CA bundle directly in the values;
/// the new stack reads it from a ConfigMap instead.
fn convert_ca_bundle(values: &LegacyValues, namespace: &str) -> Result<Option<ConfigMap>> {
    if values.auth.ca_bundle.is_empty() {
        return Ok(None);
    }

    let pem = decode_base64("auth.caBundle", &values.auth.ca_bundle)?;
    let pem = into_utf8("auth.caBundle", pem)?;

    let mut data = std::collections::BTreeMap::new();
    data.insert(CA_BUNDLE_KEY.to_string(), pem);

    Ok(Some(ConfigMap::new(
        ObjectMeta::named("ca-bundle", namespace),
        data,
    )))
}

fn convert_feature_gates(values: &LegacyValues) -> Result<std::collections::BTreeSet<String>> {
    let mut merged = std::collections::BTreeSet::new();

    for expression in [&values.api.feature_gates, &values.controller.feature_gates] {
        for (gate, enabled) in parse_feature_gates(expression)? {
            if enabled {
                merged.insert(gate);
            }
        }
    }

    Ok(merged)
}

fn convert_api(values: &LegacyValues, tables: &DefaultTables) -> Result<ApiConfiguration> {
    let api = &values.api;

    Ok(ApiConfiguration {
        docker_repository: str_if_changed(
            &api.image.repository,
            &tables.kubermatic_docker_repository,
        ),
        accessible_addons: api.accessible_addons.clone(),
        pprof_endpoint: get_pprof_endpoint(&api.pprof_endpoint, tables),
        replicas: get_replicas(api.replicas.as_ref(), tables.api_replicas)?,
        resources: convert_resources(&api.resources, &tables.api_resources)?,
    })
}

fn convert_seed_controller(
    values: &LegacyValues,
    tables: &DefaultTables,
) -> Result<SeedControllerConfiguration> {
    let controller = &values.controller;

    let mut store_container = values.store_container.trim().to_string();
    if store_container == tables.backup_store_container {
        store_container.clear();
    }

    let mut cleanup_container = values.cleanup_container.trim().to_string();
    if cleanup_container == tables.backup_cleanup_container {
        cleanup_container.clear();
    }

    let mut maximum_parallel_reconciles = 0;
    if let Some(value) = &values.max_parallel_reconcile {
        if !value.is_unset() {
            maximum_parallel_reconciles = value.as_i32()?;
        }
    }

    Ok(SeedControllerConfiguration {
        maximum_parallel_reconciles,
        docker_repository: str_if_changed(
            &controller.image.repository,
            &tables.kubermatic_docker_repository,
        ),
        backup_store_container: store_container,
        backup_cleanup_container: cleanup_container,
        pprof_endpoint: get_pprof_endpoint(&controller.pprof_endpoint, tables),
        replicas: get_replicas(controller.replicas.as_ref(), tables.seed_controller_replicas)?,
        resources: convert_resources(&controller.resources, &tables.seed_controller_resources)?,
        ..SeedControllerConfiguration::default()
    })
}

fn convert_user_cluster(
    values: &LegacyValues,
    tables: &DefaultTables,
) -> Result<UserClusterConfiguration> {
    let prometheus = &values.cluster_namespace_prometheus;

    let mut custom_rules = String::new();
    if let Some(rules) = &prometheus.rules {
        custom_rules = serde_yaml::to_string(rules).map_err(kkpmig_core::CoreError::from)?;
    }

    let mut custom_scraping_configs = String::new();
    if let Some(configs) = &prometheus.scraping_configs {
        custom_scraping_configs =
            serde_yaml::to_string(configs).map_err(kkpmig_core::CoreError::from)?;
    }

    let mut user_cluster = UserClusterConfiguration {
        kubermatic_docker_repository: str_if_changed(
            &values.kubermatic_image,
            &tables.kubermatic_docker_repository,
        ),
        dnat_controller_docker_repository: str_if_changed(
            &values.dnat_controller_image,
            &tables.dnat_controller_docker_repository,
        ),
        node_port_range: str_if_changed(&values.controller.nodeport_range, &tables.node_port_range),
        etcd_volume_size: str_if_changed(&values.etcd.disk_size, &tables.etcd_volume_size),
        overwrite_registry: values.controller.overwrite_registry.clone(),
        disable_api_server_endpoint_reconciling: values.apiserver_endpoint_reconciling_disabled,
        apiserver_replicas: get_replicas(
            values.apiserver_default_replicas.as_ref(),
            tables.apiserver_replicas,
        )?,
        ..UserClusterConfiguration::default()
    };

    user_cluster.addons.kubernetes =
        convert_addon_config(&values.controller.addons.kubernetes, tables)?;

    user_cluster.monitoring.scrape_annotation_prefix =
        values.monitoring_scrape_annotation_prefix.clone();
    user_cluster.monitoring.disable_default_rules = prometheus.disable_default_rules;
    user_cluster.monitoring.disable_default_scraping_configs =
        prometheus.disable_default_scraping_configs;
    user_cluster.monitoring.custom_rules = custom_rules;
    user_cluster.monitoring.custom_scraping_configs = custom_scraping_configs;

    Ok(user_cluster)
}

fn convert_addon_config(
    values: &AddonValues,
    tables: &DefaultTables,
) -> Result<AddonConfiguration> {
    if !values.default_addons.is_empty() && !values.default_addons_file.is_empty() {
        return Err(ConvertError::config(
            "both defaultAddons and defaultAddonsFile are configured, but they are mutually exclusive",
        ));
    }

    // a custom addon manifest file cannot be migrated automatically; the
    // operator has to paste its contents into the new field by hand
    let mut default_manifests = String::new();
    if !values.default_addons_file.is_empty()
        && values.default_addons_file != KUBERNETES_ADDONS_FILE_NAME
    {
        default_manifests = format!(
            "!! insert the contents of {} here !!",
            values.default_addons_file
        );
    }

    Ok(AddonConfiguration {
        docker_repository: str_if_changed(
            &values.image.repository,
            &tables.kubernetes_addons_docker_repository,
        ),
        default: values.default_addons.clone(),
        default_manifests,
    })
}

fn convert_master_controller(
    values: &LegacyValues,
    tables: &DefaultTables,
) -> Result<MasterControllerConfiguration> {
    let controller = &values.master_controller;

    Ok(MasterControllerConfiguration {
        docker_repository: str_if_changed(
            &controller.image.repository,
            &tables.kubermatic_docker_repository,
        ),
        pprof_endpoint: get_pprof_endpoint(&controller.pprof_endpoint, tables),
        replicas: get_replicas(
            controller.replicas.as_ref(),
            tables.master_controller_replicas,
        )?,
        resources: convert_resources(&controller.resources, &tables.master_controller_resources)?,
    })
}

fn convert_ui(values: &LegacyValues, tables: &DefaultTables) -> Result<UiConfiguration> {
    let ui = &values.ui;

    Ok(UiConfiguration {
        docker_repository: str_if_changed(&ui.image.repository, &tables.dashboard_docker_repository),
        config: ui.config.clone(),
        replicas: get_replicas(ui.replicas.as_ref(), tables.ui_replicas)?,
        resources: convert_resources(&ui.resources, &tables.ui_resources)?,
    })
}

fn convert_seeds(values: &LegacyValues, options: &Options) -> Result<Vec<Object>> {
    if values.datacenters.is_empty() {
        return Ok(Vec::new());
    }

    let datacenters = decode_base64("datacenters", &values.datacenters)?;
    let metas: DatacentersMeta =
        serde_yaml::from_slice(&datacenters).map_err(|source| ConvertError::Yaml {
            context: "datacenters.yaml",
            source,
        })?;

    let mut kubeconfig = None;
    if !values.kubeconfig.is_empty() {
        let bytes = decode_base64("kubeconfig", &values.kubeconfig)?;
        kubeconfig = Some(Kubeconfig::from_yaml(&bytes)?);
    }

    convert_datacenters(
        &metas.datacenters,
        kubeconfig.as_ref(),
        &options.namespace,
        options.pause_seeds,
    )
}

/// Convert a parsed datacenters map into Seeds and, where a global
/// kubeconfig is available, their per-seed kubeconfig Secrets.
///
/// Each Secret is emitted directly before the Seed referencing it.
pub fn convert_datacenters(
    metas: &IndexMap<String, LegacyDatacenterMeta>,
    kubeconfig: Option<&Kubeconfig>,
    namespace: &str,
    pause_seeds: bool,
) -> Result<Vec<Object>> {
    let mut objects = Vec::new();

    for mut seed in datacenter_metas_to_seeds(metas)? {
        seed.metadata.namespace = namespace.to_string();

        if pause_seeds {
            seed.metadata
                .annotations
                .insert(SKIP_RECONCILING_ANNOTATION.to_string(), String::new());
        }

        if let Some(kubeconfig) = kubeconfig {
            let split = kubeconfig.split_for_seed(&seed.metadata.name)?;
            let (secret, reference) = secret_for_seed(&seed.metadata.name, namespace, &split)?;

            seed.spec.kubeconfig = Some(reference);
            objects.push(Object::Secret(secret));
        }

        debug!(seed = %seed.metadata.name, "converted seed");
        objects.push(Object::Seed(Box::new(seed)));
    }

    Ok(objects)
}

#[derive(Debug, Default, Deserialize)]
struct PresetList {
    #[serde(default)]
    items: Vec<Preset>,
}

fn convert_presets(values: &LegacyValues, namespace: &str) -> Result<Vec<Object>> {
    if values.presets.is_empty() {
        return Ok(Vec::new());
    }

    let yaml = decode_base64("presets", &values.presets)?;
    let presets: PresetList =
        serde_yaml::from_slice(&yaml).map_err(|source| ConvertError::Yaml {
            context: "presets",
            source,
        })?;

    let mut objects = Vec::new();

    for mut preset in presets.items {
        preset.api_version = KUBERMATIC_API_VERSION.to_string();
        preset.kind = "Preset".to_string();
        preset.metadata.namespace = namespace.to_string();

        debug!(preset = %preset.metadata.name, "converted preset");
        objects.push(Object::Preset(preset));
    }

    Ok(objects)
}

/// The string elision rule: a value equal to the built-in default is
/// dropped so the default keeps applying.
pub fn str_if_changed(value: &str, default_value: &str) -> String {
    if value == default_value {
        String::new()
    } else {
        value.to_string()
    }
}

fn str_if_changed_value<T: PartialEq>(value: T, default_value: T) -> Option<T> {
    if value == default_value {
        None
    } else {
        Some(value)
    }
}

/// The replica elision rule: unset stays unset, and a value equal to the
/// built-in default is dropped.
pub fn get_replicas(value: Option<&NumericOrString>, default_value: i32) -> Result<Option<i32>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_unset() {
        return Ok(None);
    }

    let parsed = value.as_i32()?;
    if parsed == default_value {
        return Ok(None);
    }

    Ok(Some(parsed))
}

fn get_pprof_endpoint(value: &str, tables: &DefaultTables) -> Option<String> {
    if value.is_empty() || value == tables.pprof_endpoint {
        None
    } else {
        Some(value.to_string())
    }
}

/// The resource elision rule: keep only entries that differ semantically
/// from the default, so `0.1` and `100m` count as equal.
pub fn convert_resources(
    values: &ResourceRequirements,
    defaults: &ResourceRequirements,
) -> Result<ResourceRequirements> {
    Ok(ResourceRequirements {
        requests: convert_resource_list(&values.requests, &defaults.requests)?,
        limits: convert_resource_list(&values.limits, &defaults.limits)?,
    })
}

fn convert_resource_list(
    values: &Option<ResourceList>,
    defaults: &Option<ResourceList>,
) -> Result<Option<ResourceList>> {
    let Some(values) = values else {
        return Ok(None);
    };

    let mut result = ResourceList::new();

    for name in ResourceName::ALL {
        let Some(specified) = values.get(&name) else {
            continue;
        };

        let keep = match defaults.as_ref().and_then(|d| d.get(&name)) {
            Some(defaulted) => !specified.semantic_eq(defaulted).map_err(ConvertError::from)?,
            None => true,
        };

        if keep {
            result.insert(name, specified.clone());
        }
    }

    Ok(if result.is_empty() { None } else { Some(result) })
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>> {
    BASE64_STANDARD
        .decode(value.trim())
        .map_err(|source| ConvertError::Base64 { field, source })
}

fn into_utf8(field: &'static str, bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| ConvertError::config(format!("{field} is not valid UTF-8")))
}
