//! Built-in defaults and the defaulting engine
//!
//! [`DefaultTables`] is the single source of truth for every built-in value:
//! docker repositories, per-component resource constraints, replica counts,
//! the supported version matrix and the default container/addon manifests.
//! It is an immutable value handed explicitly to [`apply_defaults`] and the
//! conversion engine, so tests can substitute alternate tables.
//!
//! [`apply_defaults`] fills every recognized unset field of a configuration
//! with its built-in default. It never mutates its input and is idempotent:
//! running it on its own output changes nothing, because every defaulted
//! field is non-zero afterwards.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use tracing::debug;

use crate::config::{ExposeStrategy, KubermaticConfiguration};
use crate::error::{CoreError, Result};
use crate::resources::{ResourceName, ResourceRequirements};
use crate::seed::Seed;
use crate::versions::{Condition, Incompatibility, Operation, Update, VersioningConfiguration};

/// File name of the default addon manifest shipped with the platform.
pub const KUBERNETES_ADDONS_FILE_NAME: &str = "kubernetes-addons.yaml";

/// Every built-in default, in one place.
#[derive(Debug, Clone)]
pub struct DefaultTables {
    pub pprof_endpoint: String,
    pub node_port_range: String,
    pub etcd_volume_size: String,
    pub auth_client_id: String,
    pub ingress_class: String,
    pub certificate_issuer_kind: String,
    pub ca_bundle_config_map_name: String,
    pub s3_endpoint: String,
    pub scrape_annotation_prefix: String,
    pub expose_strategy: ExposeStrategy,

    pub api_replicas: i32,
    pub ui_replicas: i32,
    pub seed_controller_replicas: i32,
    pub master_controller_replicas: i32,
    pub apiserver_replicas: i32,
    pub maximum_parallel_reconciles: i32,

    pub kubermatic_docker_repository: String,
    pub dashboard_docker_repository: String,
    pub dnat_controller_docker_repository: String,
    pub etcd_launcher_docker_repository: String,
    pub kubernetes_addons_docker_repository: String,
    pub nodeport_proxy_docker_repository: String,
    pub envoy_docker_repository: String,
    pub vpa_recommender_docker_repository: String,
    pub vpa_updater_docker_repository: String,
    pub vpa_admission_controller_docker_repository: String,

    pub accessible_addons: Vec<String>,
    pub ui_config: String,
    pub backup_store_container: String,
    pub backup_restore_store_container: String,
    pub backup_cleanup_container: String,
    pub backup_delete_container: String,
    pub kubernetes_addons_manifest: String,

    pub api_resources: ResourceRequirements,
    pub ui_resources: ResourceRequirements,
    pub seed_controller_resources: ResourceRequirements,
    pub master_controller_resources: ResourceRequirements,
    pub vpa_recommender_resources: ResourceRequirements,
    pub vpa_updater_resources: ResourceRequirements,
    pub vpa_admission_controller_resources: ResourceRequirements,
    pub nodeport_proxy_envoy_resources: ResourceRequirements,
    pub nodeport_proxy_envoy_manager_resources: ResourceRequirements,
    pub nodeport_proxy_updater_resources: ResourceRequirements,

    pub nodeport_proxy_service_annotations: BTreeMap<String, String>,
    pub kubernetes_versioning: VersioningConfiguration,
}

static TABLES: Lazy<DefaultTables> = Lazy::new(DefaultTables::new);

impl DefaultTables {
    /// The shared built-in tables.
    pub fn get() -> &'static DefaultTables {
        &TABLES
    }

    pub fn new() -> Self {
        use ResourceName::{Cpu, Memory};

        Self {
            pprof_endpoint: ":6600".to_string(),
            node_port_range: "30000-32767".to_string(),
            etcd_volume_size: "5Gi".to_string(),
            auth_client_id: "kubermatic".to_string(),
            ingress_class: "nginx".to_string(),
            certificate_issuer_kind: "ClusterIssuer".to_string(),
            ca_bundle_config_map_name: "ca-bundle".to_string(),
            s3_endpoint: "s3.amazonaws.com".to_string(),
            scrape_annotation_prefix: "monitoring.kubermatic.io".to_string(),
            expose_strategy: ExposeStrategy::NodePort,

            api_replicas: 2,
            ui_replicas: 2,
            seed_controller_replicas: 1,
            master_controller_replicas: 1,
            apiserver_replicas: 2,
            maximum_parallel_reconciles: 10,

            kubermatic_docker_repository: "quay.io/kubermatic/kubermatic".to_string(),
            dashboard_docker_repository: "quay.io/kubermatic/dashboard".to_string(),
            dnat_controller_docker_repository: "quay.io/kubermatic/kubeletdnat-controller"
                .to_string(),
            etcd_launcher_docker_repository: "quay.io/kubermatic/etcd-launcher".to_string(),
            kubernetes_addons_docker_repository: "quay.io/kubermatic/addons".to_string(),
            nodeport_proxy_docker_repository: "quay.io/kubermatic/nodeport-proxy".to_string(),
            envoy_docker_repository: "docker.io/envoyproxy/envoy-alpine".to_string(),
            vpa_recommender_docker_repository: "gcr.io/google_containers/vpa-recommender"
                .to_string(),
            vpa_updater_docker_repository: "gcr.io/google_containers/vpa-updater".to_string(),
            vpa_admission_controller_docker_repository:
                "gcr.io/google_containers/vpa-admission-controller".to_string(),

            accessible_addons: vec![
                "cluster-autoscaler".to_string(),
                "node-exporter".to_string(),
                "kube-state-metrics".to_string(),
            ],
            ui_config: DEFAULT_UI_CONFIG.trim().to_string(),
            backup_store_container: DEFAULT_BACKUP_STORE_CONTAINER.trim().to_string(),
            backup_restore_store_container: DEFAULT_RESTORE_BACKUP_STORE_CONTAINER
                .trim()
                .to_string(),
            backup_cleanup_container: DEFAULT_BACKUP_CLEANUP_CONTAINER.trim().to_string(),
            backup_delete_container: DEFAULT_BACKUP_DELETE_CONTAINER.trim().to_string(),
            kubernetes_addons_manifest: DEFAULT_KUBERNETES_ADDONS.trim().to_string(),

            ui_resources: ResourceRequirements::new(
                [(Cpu, "100m"), (Memory, "64Mi")],
                [(Cpu, "250m"), (Memory, "128Mi")],
            ),
            api_resources: ResourceRequirements::new(
                [(Cpu, "100m"), (Memory, "512Mi")],
                [(Cpu, "250m"), (Memory, "1Gi")],
            ),
            master_controller_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "128Mi")],
                [(Cpu, "100m"), (Memory, "256Mi")],
            ),
            seed_controller_resources: ResourceRequirements::new(
                [(Cpu, "200m"), (Memory, "512Mi")],
                [(Cpu, "500m"), (Memory, "1Gi")],
            ),
            vpa_recommender_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "512Mi")],
                [(Cpu, "200m"), (Memory, "3Gi")],
            ),
            vpa_updater_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "32Mi")],
                [(Cpu, "200m"), (Memory, "128Mi")],
            ),
            vpa_admission_controller_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "32Mi")],
                [(Cpu, "200m"), (Memory, "128Mi")],
            ),
            nodeport_proxy_envoy_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "32Mi")],
                [(Cpu, "1"), (Memory, "128Mi")],
            ),
            nodeport_proxy_envoy_manager_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "32Mi")],
                [(Cpu, "150m"), (Memory, "48Mi")],
            ),
            nodeport_proxy_updater_resources: ResourceRequirements::new(
                [(Cpu, "50m"), (Memory, "32Mi")],
                [(Cpu, "150m"), (Memory, "32Mi")],
            ),

            nodeport_proxy_service_annotations: [
                // On AWS an NLB gives the proxy a fixed IP
                (
                    "service.beta.kubernetes.io/aws-load-balancer-type".to_string(),
                    "nlb".to_string(),
                ),
                // The AWS default of 60s cuts long-running log streams
                (
                    "service.beta.kubernetes.io/aws-load-balancer-connection-idle-timeout"
                        .to_string(),
                    "3600".to_string(),
                ),
            ]
            .into_iter()
            .collect(),

            kubernetes_versioning: default_kubernetes_versioning(),
        }
    }
}

impl Default for DefaultTables {
    fn default() -> Self {
        Self::new()
    }
}

fn default_kubernetes_versioning() -> VersioningConfiguration {
    use semver::Version;

    VersioningConfiguration {
        default: Some(Version::new(1, 21, 8)),
        versions: vec![
            // Kubernetes 1.20
            Version::new(1, 20, 13),
            Version::new(1, 20, 14),
            // Kubernetes 1.21
            Version::new(1, 21, 8),
            // Kubernetes 1.22
            Version::new(1, 22, 5),
        ],
        updates: vec![
            // auto-upgrade unsupported 1.19 clusters
            Update {
                from: "1.19.*".to_string(),
                to: "1.20.13".to_string(),
                automatic: true,
            },
            Update {
                from: "1.20.*".to_string(),
                to: "1.20.*".to_string(),
                automatic: false,
            },
            // CVE-2021-25741, CVE-2021-3711/3712, CVE-2021-33910
            Update {
                from: ">= 1.20.0, < 1.20.13".to_string(),
                to: "1.20.13".to_string(),
                automatic: true,
            },
            Update {
                from: "1.20.*".to_string(),
                to: "1.21.*".to_string(),
                automatic: false,
            },
            Update {
                from: "1.21.*".to_string(),
                to: "1.21.*".to_string(),
                automatic: false,
            },
            // CVE-2021-44716, CVE-2021-44717 among others
            Update {
                from: ">= 1.21.0, < 1.21.8".to_string(),
                to: "1.21.8".to_string(),
                automatic: true,
            },
            Update {
                from: "1.21.*".to_string(),
                to: "1.22.*".to_string(),
                automatic: false,
            },
            Update {
                from: "1.22.*".to_string(),
                to: "1.22.*".to_string(),
                automatic: false,
            },
            Update {
                from: ">= 1.22.0, < 1.22.5".to_string(),
                to: "1.22.5".to_string(),
                automatic: true,
            },
        ],
        provider_incompatibilities: vec![
            Incompatibility {
                provider: "vsphere".to_string(),
                version: "1.23.*".to_string(),
                condition: Condition::Always,
                operation: Operation::Create,
            },
            Incompatibility {
                provider: "vsphere".to_string(),
                version: "1.23.*".to_string(),
                condition: Condition::ExternalCloudProvider,
                operation: Operation::Update,
            },
            Incompatibility {
                provider: "vsphere".to_string(),
                version: "1.23.*".to_string(),
                condition: Condition::ExternalCloudProvider,
                operation: Operation::Support,
            },
        ],
    }
}

/// Fill every recognized unset field of `config` with its built-in default.
///
/// Returns a fresh value; the input is never mutated. The only hard
/// failures are a docker repository carrying an explicit tag and the
/// backup/restore block being enabled without a bucket name.
pub fn apply_defaults(
    config: &KubermaticConfiguration,
    tables: &DefaultTables,
) -> Result<KubermaticConfiguration> {
    debug!("applying defaults to KubermaticConfiguration");

    let mut config = config.clone();
    let spec = &mut config.spec;

    if spec.expose_strategy.is_none() {
        spec.expose_strategy = Some(tables.expose_strategy);
        debug!(field = "exposeStrategy", value = %tables.expose_strategy, "defaulting field");
    }

    if spec.ca_bundle.name.is_empty() {
        spec.ca_bundle.name = tables.ca_bundle_config_map_name.clone();
        debug!(field = "caBundle.name", value = %spec.ca_bundle.name, "defaulting field");
    }

    let seed_controller = &mut spec.seed_controller;

    if seed_controller.maximum_parallel_reconciles == 0 {
        seed_controller.maximum_parallel_reconciles = tables.maximum_parallel_reconciles;
        debug!(
            field = "seedController.maximumParallelReconciles",
            value = seed_controller.maximum_parallel_reconciles,
            "defaulting field"
        );
    }

    if seed_controller.backup_store_container.is_empty() {
        // the restore-capable backup flow ships its own store container
        seed_controller.backup_store_container = if seed_controller.backup_restore.enabled {
            tables.backup_restore_store_container.clone()
        } else {
            tables.backup_store_container.clone()
        };
        debug!(field = "seedController.backupStoreContainer", "defaulting field");
    }

    if seed_controller.backup_cleanup_container.is_empty()
        && !seed_controller.backup_restore.enabled
    {
        seed_controller.backup_cleanup_container = tables.backup_cleanup_container.clone();
        debug!(field = "seedController.backupCleanupContainer", "defaulting field");
    }

    if seed_controller.backup_restore.enabled {
        if seed_controller.backup_restore.s3_endpoint.is_empty() {
            seed_controller.backup_restore.s3_endpoint = tables.s3_endpoint.clone();
            debug!(
                field = "seedController.backupRestore.s3Endpoint",
                value = %seed_controller.backup_restore.s3_endpoint,
                "defaulting field"
            );
        }

        if seed_controller.backup_restore.s3_bucket_name.is_empty() {
            return Err(CoreError::invalid_config(
                "backupRestore.enabled is set, but s3BucketName is unset",
            ));
        }

        if seed_controller.backup_delete_container.is_empty() {
            seed_controller.backup_delete_container = tables.backup_delete_container.clone();
            debug!(field = "seedController.backupDeleteContainer", "defaulting field");
        }
    }

    if seed_controller.replicas.is_none() {
        seed_controller.replicas = Some(tables.seed_controller_replicas);
        debug!(field = "seedController.replicas", value = tables.seed_controller_replicas, "defaulting field");
    }

    if seed_controller.pprof_endpoint.is_none() {
        seed_controller.pprof_endpoint = Some(tables.pprof_endpoint.clone());
        debug!(field = "seedController.pprofEndpoint", value = %tables.pprof_endpoint, "defaulting field");
    }

    if spec.api.pprof_endpoint.is_none() {
        spec.api.pprof_endpoint = Some(tables.pprof_endpoint.clone());
        debug!(field = "api.pprofEndpoint", value = %tables.pprof_endpoint, "defaulting field");
    }

    if spec.master_controller.pprof_endpoint.is_none() {
        spec.master_controller.pprof_endpoint = Some(tables.pprof_endpoint.clone());
        debug!(field = "masterController.pprofEndpoint", value = %tables.pprof_endpoint, "defaulting field");
    }

    if spec.master_controller.replicas.is_none() {
        spec.master_controller.replicas = Some(tables.master_controller_replicas);
        debug!(field = "masterController.replicas", value = tables.master_controller_replicas, "defaulting field");
    }

    let addons = &mut spec.user_cluster.addons.kubernetes;
    if addons.default.is_empty() && addons.default_manifests.is_empty() {
        addons.default_manifests = tables.kubernetes_addons_manifest.clone();
        debug!(field = "userCluster.addons.kubernetes.defaultManifests", "defaulting field");
    }

    if spec.user_cluster.apiserver_replicas.is_none() {
        spec.user_cluster.apiserver_replicas = Some(tables.apiserver_replicas);
        debug!(field = "userCluster.apiserverReplicas", value = tables.apiserver_replicas, "defaulting field");
    }

    if spec.api.accessible_addons.is_empty() {
        spec.api.accessible_addons = tables.accessible_addons.clone();
        debug!(field = "api.accessibleAddons", "defaulting field");
    }

    if spec.api.replicas.is_none() {
        spec.api.replicas = Some(tables.api_replicas);
        debug!(field = "api.replicas", value = tables.api_replicas, "defaulting field");
    }

    if spec.user_cluster.node_port_range.is_empty() {
        spec.user_cluster.node_port_range = tables.node_port_range.clone();
        debug!(field = "userCluster.nodePortRange", value = %spec.user_cluster.node_port_range, "defaulting field");
    }

    if spec.user_cluster.etcd_volume_size.is_empty() {
        spec.user_cluster.etcd_volume_size = tables.etcd_volume_size.clone();
        debug!(field = "userCluster.etcdVolumeSize", value = %spec.user_cluster.etcd_volume_size, "defaulting field");
    }

    if spec.user_cluster.monitoring.scrape_annotation_prefix.is_empty() {
        spec.user_cluster.monitoring.scrape_annotation_prefix =
            tables.scrape_annotation_prefix.clone();
        debug!(
            field = "userCluster.monitoring.scrapeAnnotationPrefix",
            value = %spec.user_cluster.monitoring.scrape_annotation_prefix,
            "defaulting field"
        );
    }

    if spec.ingress.class_name.is_empty() {
        spec.ingress.class_name = tables.ingress_class.clone();
        debug!(field = "ingress.className", value = %spec.ingress.class_name, "defaulting field");
    }

    // cert-manager's own default is Issuer, but the platform never creates
    // one, so a ClusterIssuer is the sensible unset value
    if spec.ingress.certificate_issuer.kind.is_empty() {
        spec.ingress.certificate_issuer.kind = tables.certificate_issuer_kind.clone();
        debug!(field = "ingress.certificateIssuer.kind", value = %spec.ingress.certificate_issuer.kind, "defaulting field");
    }

    if spec.ui.config.is_empty() {
        spec.ui.config = tables.ui_config.clone();
        debug!(field = "ui.config", "defaulting field");
    }

    if spec.ui.replicas.is_none() {
        spec.ui.replicas = Some(tables.ui_replicas);
        debug!(field = "ui.replicas", value = tables.ui_replicas, "defaulting field");
    }

    default_versioning(&mut spec.versions, &tables.kubernetes_versioning, "versions");

    let auth = &mut spec.auth;

    if auth.client_id.is_empty() {
        auth.client_id = tables.auth_client_id.clone();
        debug!(field = "auth.clientID", value = %auth.client_id, "defaulting field");
    }

    if auth.issuer_client_id.is_empty() {
        auth.issuer_client_id = format!("{}Issuer", auth.client_id);
        debug!(field = "auth.issuerClientID", value = %auth.issuer_client_id, "defaulting field");
    }

    if auth.token_issuer.is_empty() && !spec.ingress.domain.is_empty() {
        auth.token_issuer = format!("https://{}/dex", spec.ingress.domain);
        debug!(field = "auth.tokenIssuer", value = %auth.token_issuer, "defaulting field");
    }

    if auth.issuer_redirect_url.is_empty() && !spec.ingress.domain.is_empty() {
        auth.issuer_redirect_url = format!("https://{}/api/v1/kubeconfig", spec.ingress.domain);
        debug!(field = "auth.issuerRedirectURL", value = %auth.issuer_redirect_url, "defaulting field");
    }

    default_docker_repo(
        &mut spec.api.docker_repository,
        &tables.kubermatic_docker_repository,
        "api.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.ui.docker_repository,
        &tables.dashboard_docker_repository,
        "ui.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.master_controller.docker_repository,
        &tables.kubermatic_docker_repository,
        "masterController.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.seed_controller.docker_repository,
        &tables.kubermatic_docker_repository,
        "seedController.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.user_cluster.kubermatic_docker_repository,
        &tables.kubermatic_docker_repository,
        "userCluster.kubermaticDockerRepository",
    )?;
    default_docker_repo(
        &mut spec.user_cluster.dnat_controller_docker_repository,
        &tables.dnat_controller_docker_repository,
        "userCluster.dnatControllerDockerRepository",
    )?;
    default_docker_repo(
        &mut spec.user_cluster.etcd_launcher_docker_repository,
        &tables.etcd_launcher_docker_repository,
        "userCluster.etcdLauncherDockerRepository",
    )?;
    default_docker_repo(
        &mut spec.user_cluster.addons.kubernetes.docker_repository,
        &tables.kubernetes_addons_docker_repository,
        "userCluster.addons.kubernetes.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.vertical_pod_autoscaler.recommender.docker_repository,
        &tables.vpa_recommender_docker_repository,
        "verticalPodAutoscaler.recommender.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.vertical_pod_autoscaler.updater.docker_repository,
        &tables.vpa_updater_docker_repository,
        "verticalPodAutoscaler.updater.dockerRepository",
    )?;
    default_docker_repo(
        &mut spec.vertical_pod_autoscaler.admission_controller.docker_repository,
        &tables.vpa_admission_controller_docker_repository,
        "verticalPodAutoscaler.admissionController.dockerRepository",
    )?;

    default_resources(&mut spec.ui.resources, &tables.ui_resources, "ui.resources");
    default_resources(&mut spec.api.resources, &tables.api_resources, "api.resources");
    default_resources(
        &mut spec.seed_controller.resources,
        &tables.seed_controller_resources,
        "seedController.resources",
    );
    default_resources(
        &mut spec.master_controller.resources,
        &tables.master_controller_resources,
        "masterController.resources",
    );
    default_resources(
        &mut spec.vertical_pod_autoscaler.recommender.resources,
        &tables.vpa_recommender_resources,
        "verticalPodAutoscaler.recommender.resources",
    );
    default_resources(
        &mut spec.vertical_pod_autoscaler.updater.resources,
        &tables.vpa_updater_resources,
        "verticalPodAutoscaler.updater.resources",
    );
    default_resources(
        &mut spec.vertical_pod_autoscaler.admission_controller.resources,
        &tables.vpa_admission_controller_resources,
        "verticalPodAutoscaler.admissionController.resources",
    );

    Ok(config)
}

/// Fill every recognized unset field of a Seed with its built-in default.
pub fn apply_seed_defaults(seed: &Seed, tables: &DefaultTables) -> Result<Seed> {
    debug!(seed = %seed.metadata.name, "applying defaults to Seed");

    let mut seed = seed.clone();
    let proxy = &mut seed.spec.nodeport_proxy;

    default_docker_repo(
        &mut proxy.envoy.docker_repository,
        &tables.envoy_docker_repository,
        "nodeportProxy.envoy.dockerRepository",
    )?;
    default_docker_repo(
        &mut proxy.envoy_manager.docker_repository,
        &tables.nodeport_proxy_docker_repository,
        "nodeportProxy.envoyManager.dockerRepository",
    )?;
    default_docker_repo(
        &mut proxy.updater.docker_repository,
        &tables.nodeport_proxy_docker_repository,
        "nodeportProxy.updater.dockerRepository",
    )?;

    default_resources(
        &mut proxy.envoy.resources,
        &tables.nodeport_proxy_envoy_resources,
        "nodeportProxy.envoy.resources",
    );
    default_resources(
        &mut proxy.envoy_manager.resources,
        &tables.nodeport_proxy_envoy_manager_resources,
        "nodeportProxy.envoyManager.resources",
    );
    default_resources(
        &mut proxy.updater.resources,
        &tables.nodeport_proxy_updater_resources,
        "nodeportProxy.updater.resources",
    );

    if proxy.annotations.is_empty() {
        proxy.annotations = tables.nodeport_proxy_service_annotations.clone();
        debug!(field = "nodeportProxy.annotations", "defaulting field");
    }

    Ok(seed)
}

/// Default an image repository field, validating configured values.
///
/// Tags belong to a separate field, so any `repo:tag` value is rejected.
fn default_docker_repo(repo: &mut String, default_repo: &str, key: &str) -> Result<()> {
    if repo.is_empty() {
        *repo = default_repo.to_string();
        debug!(field = key, value = %default_repo, "defaulting docker repository");
        return Ok(());
    }

    // a colon after the last path separator is either a tag or a port;
    // ports only appear in the registry component (before the first slash)
    let after_slash = repo.rsplit('/').next().unwrap_or(repo.as_str());
    let has_tag = if repo.contains('/') {
        after_slash.contains(':')
    } else {
        repo.contains(':')
    };

    if has_tag {
        return Err(CoreError::invalid_config(format!(
            "it is not allowed to specify an image tag for the {key} repository"
        )));
    }

    Ok(())
}

/// Default a requests/limits pair.
///
/// A wholly absent map is replaced with the default map; a supplied map is
/// only filled where entries are missing or zero-valued. An operator who
/// writes any resource block wants partial control over it.
fn default_resources(
    settings: &mut ResourceRequirements,
    defaults: &ResourceRequirements,
    key: &str,
) {
    default_resource_list(&mut settings.requests, &defaults.requests, key, "requests");
    default_resource_list(&mut settings.limits, &defaults.limits, key, "limits");
}

fn default_resource_list(
    list: &mut Option<crate::resources::ResourceList>,
    defaults: &Option<crate::resources::ResourceList>,
    key: &str,
    kind: &str,
) {
    let Some(defaults) = defaults else {
        return;
    };

    match list {
        None => {
            *list = Some(defaults.clone());
            debug!(field = %format!("{key}.{kind}"), "defaulting resource constraints");
        }
        Some(list) => {
            for name in ResourceName::ALL {
                let needs_default = match list.get(&name) {
                    Some(quantity) => quantity.is_zero(),
                    None => true,
                };
                if needs_default {
                    if let Some(value) = defaults.get(&name) {
                        list.insert(name, value.clone());
                        debug!(
                            field = %format!("{key}.{kind}.{name}"),
                            value = %value,
                            "defaulting resource constraint"
                        );
                    }
                }
            }
        }
    }
}

/// Default the version matrix. Versioning is all-or-nothing: if any piece
/// is missing, the whole built-in matrix replaces the block.
fn default_versioning(
    settings: &mut VersioningConfiguration,
    defaults: &VersioningConfiguration,
    key: &str,
) {
    if settings.is_incomplete() {
        *settings = defaults.clone();
        debug!(field = key, "defaulting version matrix");
    }
}

const DEFAULT_UI_CONFIG: &str = r#"
{
  "share_kubeconfig": false
}"#;

const DEFAULT_BACKUP_STORE_CONTAINER: &str = r#"
name: store-container
image: quay.io/kubermatic/s3-storer:v0.1.4
command:
- /bin/sh
- -c
- |
  set -euo pipefail

  endpoint=minio.minio.svc.cluster.local:9000
  bucket=kubermatic-etcd-backups

  s3-storeuploader store --file /backup/snapshot.db --endpoint "$endpoint" --bucket "$bucket" --create-bucket --prefix $CLUSTER
  s3-storeuploader delete-old-revisions --max-revisions 20 --endpoint "$endpoint" --bucket "$bucket" --prefix $CLUSTER
env:
- name: ACCESS_KEY_ID
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: ACCESS_KEY_ID
- name: SECRET_ACCESS_KEY
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: SECRET_ACCESS_KEY
volumeMounts:
- name: etcd-backup
  mountPath: /backup
"#;

const DEFAULT_RESTORE_BACKUP_STORE_CONTAINER: &str = r#"
name: store-container
image: d3fk/s3cmd@sha256:2061883abbf0ebcf0ea3d5d218558c9c229f212e9c08af4acdaa3758980eb67a
command:
- /bin/sh
- -c
- |
  set -e
  s3cmd --access_key=$ACCESS_KEY_ID --secret_key=$SECRET_ACCESS_KEY --host=$ENDPOINT --host-bucket='%(bucket).'$ENDPOINT put /backup/snapshot.db s3://$BUCKET_NAME/$CLUSTER-$BACKUP_TO_CREATE
env:
- name: ACCESS_KEY_ID
  valueFrom:
    secretKeyRef:
      name: backup-s3
      key: ACCESS_KEY_ID
- name: SECRET_ACCESS_KEY
  valueFrom:
    secretKeyRef:
      name: backup-s3
      key: SECRET_ACCESS_KEY
- name: BUCKET_NAME
  valueFrom:
    configMapKeyRef:
      name: s3-settings
      key: BUCKET_NAME
- name: ENDPOINT
  valueFrom:
    configMapKeyRef:
      name: s3-settings
      key: ENDPOINT
volumeMounts:
- name: etcd-backup
  mountPath: /backup
"#;

const DEFAULT_BACKUP_CLEANUP_CONTAINER: &str = r#"
name: cleanup-container
image: quay.io/kubermatic/s3-storer:v0.1.4
command:
- /bin/sh
- -c
- |
  set -euo pipefail

  endpoint=minio.minio.svc.cluster.local:9000
  bucket=kubermatic-etcd-backups

  s3-storeuploader delete-old-revisions --max-revisions 1 --endpoint "$endpoint" --bucket "$bucket" --prefix $CLUSTER
env:
- name: ACCESS_KEY_ID
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: ACCESS_KEY_ID
- name: SECRET_ACCESS_KEY
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: SECRET_ACCESS_KEY
"#;

const DEFAULT_BACKUP_DELETE_CONTAINER: &str = r#"
name: delete-container
image: quay.io/kubermatic/s3-storer:v0.1.4
command:
- /bin/sh
- -c
- |
  set -euo pipefail

  s3-storeuploader delete-all --endpoint "$S3_ENDPOINT" --bucket "$S3_BUCKET" --prefix $CLUSTER
env:
- name: ACCESS_KEY_ID
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: ACCESS_KEY_ID
- name: SECRET_ACCESS_KEY
  valueFrom:
    secretKeyRef:
      name: s3-credentials
      key: SECRET_ACCESS_KEY
"#;

const DEFAULT_KUBERNETES_ADDONS: &str = r#"
apiVersion: v1
kind: List
items:
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: canal
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: csi
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: kube-proxy
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: openvpn
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: rbac
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: kubelet-configmap
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: default-storage-class
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: pod-security-policy
    labels:
      addons.kubermatic.io/ensure: true
- apiVersion: kubermatic.k8s.io/v1
  kind: Addon
  metadata:
    name: logrotate
    labels:
      addons.kubermatic.io/ensure: true
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Quantity;

    fn tables() -> DefaultTables {
        DefaultTables::new()
    }

    #[test]
    fn test_apply_defaults_fills_empty_config() {
        let config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        let defaulted = apply_defaults(&config, &tables()).unwrap();

        assert_eq!(defaulted.spec.expose_strategy, Some(ExposeStrategy::NodePort));
        assert_eq!(defaulted.spec.api.replicas, Some(2));
        assert_eq!(defaulted.spec.ui.replicas, Some(2));
        assert_eq!(defaulted.spec.seed_controller.replicas, Some(1));
        assert_eq!(defaulted.spec.user_cluster.node_port_range, "30000-32767");
        assert_eq!(defaulted.spec.auth.client_id, "kubermatic");
        assert_eq!(defaulted.spec.auth.issuer_client_id, "kubermaticIssuer");
        assert_eq!(defaulted.spec.ca_bundle.name, "ca-bundle");
        assert_eq!(
            defaulted.spec.api.docker_repository,
            "quay.io/kubermatic/kubermatic"
        );
        assert!(!defaulted.spec.versions.is_incomplete());
        // the input must not have been touched
        assert_eq!(config.spec.api.replicas, None);
    }

    #[test]
    fn test_apply_defaults_is_idempotent() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.ingress.domain = "kkp.example.com".to_string();

        let once = apply_defaults(&config, &tables()).unwrap();
        let twice = apply_defaults(&once, &tables()).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_defaults_respects_set_values() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.api.replicas = Some(7);
        config.spec.auth.client_id = "custom".to_string();

        let defaulted = apply_defaults(&config, &tables()).unwrap();
        assert_eq!(defaulted.spec.api.replicas, Some(7));
        assert_eq!(defaulted.spec.auth.client_id, "custom");
        assert_eq!(defaulted.spec.auth.issuer_client_id, "customIssuer");
    }

    #[test]
    fn test_auth_urls_derived_from_domain() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.ingress.domain = "kkp.example.com".to_string();

        let defaulted = apply_defaults(&config, &tables()).unwrap();
        assert_eq!(defaulted.spec.auth.token_issuer, "https://kkp.example.com/dex");
        assert_eq!(
            defaulted.spec.auth.issuer_redirect_url,
            "https://kkp.example.com/api/v1/kubeconfig"
        );
    }

    #[test]
    fn test_tagged_docker_repo_is_rejected() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.api.docker_repository = "quay.io/kubermatic/kubermatic:v2.18.0".to_string();

        let err = apply_defaults(&config, &tables()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { .. }));
    }

    #[test]
    fn test_registry_port_is_not_a_tag() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.api.docker_repository = "registry.local:5000/kubermatic/api".to_string();

        assert!(apply_defaults(&config, &tables()).is_ok());
    }

    #[test]
    fn test_backup_restore_requires_bucket() {
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.seed_controller.backup_restore.enabled = true;

        let err = apply_defaults(&config, &tables()).unwrap_err();
        assert!(err.to_string().contains("s3BucketName"));

        config.spec.seed_controller.backup_restore.s3_bucket_name = "backups".to_string();
        let defaulted = apply_defaults(&config, &tables()).unwrap();
        assert_eq!(
            defaulted.spec.seed_controller.backup_restore.s3_endpoint,
            "s3.amazonaws.com"
        );
        assert!(!defaulted.spec.seed_controller.backup_delete_container.is_empty());
    }

    #[test]
    fn test_backup_restore_picks_restore_store_container() {
        let t = tables();

        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        let defaulted = apply_defaults(&config, &t).unwrap();
        assert_eq!(
            defaulted.spec.seed_controller.backup_store_container,
            t.backup_store_container
        );

        config.spec.seed_controller.backup_restore.enabled = true;
        config.spec.seed_controller.backup_restore.s3_bucket_name = "backups".to_string();
        let defaulted = apply_defaults(&config, &t).unwrap();
        assert_eq!(
            defaulted.spec.seed_controller.backup_store_container,
            t.backup_restore_store_container
        );
        // the legacy cleanup container has no place in the restore flow
        assert!(defaulted.spec.seed_controller.backup_cleanup_container.is_empty());
    }

    #[test]
    fn test_resource_defaulting_asymmetry() {
        let t = tables();

        // absent map: replaced wholesale
        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        let defaulted = apply_defaults(&config, &t).unwrap();
        assert_eq!(defaulted.spec.ui.resources.requests, t.ui_resources.requests);

        // supplied map: only missing keys are filled
        config.spec.ui.resources.requests = Some(
            [(ResourceName::Cpu, Quantity::from("1"))]
                .into_iter()
                .collect(),
        );
        let defaulted = apply_defaults(&config, &t).unwrap();
        let requests = defaulted.spec.ui.resources.requests.unwrap();
        assert_eq!(requests[&ResourceName::Cpu].as_str(), "1");
        assert_eq!(requests[&ResourceName::Memory].as_str(), "64Mi");
    }

    #[test]
    fn test_zero_resource_quantities_are_replaced() {
        let t = tables();

        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        config.spec.ui.resources.requests = Some(
            [
                (ResourceName::Cpu, Quantity::from("0")),
                (ResourceName::Memory, Quantity::from("0Gi")),
            ]
            .into_iter()
            .collect(),
        );

        let defaulted = apply_defaults(&config, &t).unwrap();
        let requests = defaulted.spec.ui.resources.requests.unwrap();
        assert_eq!(requests[&ResourceName::Cpu].as_str(), "100m");
        assert_eq!(requests[&ResourceName::Memory].as_str(), "64Mi");
    }

    #[test]
    fn test_versioning_defaulted_all_or_nothing() {
        let t = tables();

        let mut config = KubermaticConfiguration::named("kubermatic", "kubermatic");
        // a matrix with only versions set is incomplete and gets replaced
        config.spec.versions.versions = vec!["1.19.0".parse().unwrap()];

        let defaulted = apply_defaults(&config, &t).unwrap();
        assert_eq!(defaulted.spec.versions, t.kubernetes_versioning);
    }

    #[test]
    fn test_seed_defaults() {
        let seed = Seed::named("eu-west", "kubermatic");
        let defaulted = apply_seed_defaults(&seed, &tables()).unwrap();

        assert_eq!(
            defaulted.spec.nodeport_proxy.envoy.docker_repository,
            "docker.io/envoyproxy/envoy-alpine"
        );
        assert_eq!(
            defaulted.spec.nodeport_proxy.updater.docker_repository,
            "quay.io/kubermatic/nodeport-proxy"
        );
        assert!(!defaulted.spec.nodeport_proxy.annotations.is_empty());
        // input untouched
        assert!(seed.spec.nodeport_proxy.is_empty());
    }

    #[test]
    fn test_seed_defaults_idempotent() {
        let seed = Seed::named("eu-west", "kubermatic");
        let once = apply_seed_defaults(&seed, &tables()).unwrap();
        let twice = apply_seed_defaults(&once, &tables()).unwrap();
        assert_eq!(once, twice);
    }
}
