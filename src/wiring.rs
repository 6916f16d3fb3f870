//! Builds every collaborator once at startup and hands them out explicitly.
//!
//! Anything that fails here is an [`AppError::IrrecoverableWiringError`]; the
//! process exits instead of retrying.

use std::sync::Arc;

use kube::runtime::watcher;
use kube::{Api, Client};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app_state::AppState;
use crate::config::OperatorConfig;
use crate::core::client::applier::{KubeApplier, ResourceApplier};
use crate::core::client::capability::KubeCapabilityProbe;
use crate::core::client::kube_client::{build_guest_kube_client, build_kube_client};
use crate::core::client::kube_resources::{
    ClusterCSIDriver, ConfigMap, Infrastructure, Node, Proxy, Secret, StorageClass,
};
use crate::core::client::listers::{
    CachedConfigMaps, CachedOperator, CachedProxy, CachedStorageClasses, OperatorSource,
};
use crate::core::client::manifests::FsManifestSource;
use crate::core::client::openshift::{CLUSTER_CSI_DRIVER_NAME, INFRASTRUCTURE_NAME, PROXY_NAME};
use crate::core::client::operator_client::KubeOperatorClient;
use crate::core::client::store::Informer;
use crate::core::state::cluster::cluster_state_source::{CachedClusterState, ClusterStateNames};
use crate::core::state::runtime::controllers::controller_status_manager::{
    ControllerStatusManager, SharedStatus,
};
use crate::domain::gate::{CrdExists, ResourceGate};
use crate::domain::mirror::{ConfigMirrorEntry, ResourceLocation};
use crate::domain::topology::{controller_pipeline, node_pipeline, PipelineSettings, Topology};
use crate::errors::AppError;
use crate::logging::LogFilterSink;
use crate::orchestrator::{Domain, DomainKind, Orchestrator};
use crate::scheduler::controller_loop::ControllerLoop;
use crate::scheduler::tasks::conditional_resources::task::ConditionalResourcesController;
use crate::scheduler::tasks::config_mirror::task::ConfigMirrorController;
use crate::scheduler::tasks::config_observer::task::ConfigObserverController;
use crate::scheduler::tasks::log_level::task::LogLevelController;
use crate::scheduler::tasks::management_state::task::ManagementStateController;
use crate::scheduler::tasks::operator_status::task::OperatorStatusController;
use crate::scheduler::tasks::static_resources::task::{StaticResource, StaticResourcesController};
use crate::scheduler::tasks::storage_class::task::StorageClassController;
use crate::scheduler::tasks::workload::task::{WorkloadController, WorkloadTemplate};

pub const CREDENTIALS_SECRET: &str = "ebs-cloud-credentials";
pub const CLOUD_CONFIG: &str = "kube-cloud-config";
pub const CLOUD_CONFIG_SOURCE_NAMESPACE: &str = "openshift-config-managed";
pub const TRUSTED_CA_CONFIG_MAP: &str = "aws-ebs-csi-driver-trusted-ca-bundle";
pub const OPERAND_NAME: &str = "aws-ebs-csi-driver";
pub const SNAPSHOT_CLASS_CRD: &str = "volumesnapshotclasses.snapshot.storage.k8s.io";

const CONTROL_PLANE_ASSETS: [&str; 3] = ["controller_sa.yaml", "controller_pdb.yaml", "cabundle_cm.yaml"];

/// Only meaningful when the controller shares the cluster with its RBAC.
const STANDALONE_CONTROL_PLANE_ASSETS: [&str; 13] = [
    "rbac/attacher_role.yaml",
    "rbac/attacher_binding.yaml",
    "rbac/provisioner_role.yaml",
    "rbac/provisioner_binding.yaml",
    "rbac/resizer_role.yaml",
    "rbac/resizer_binding.yaml",
    "rbac/snapshotter_role.yaml",
    "rbac/snapshotter_binding.yaml",
    "service.yaml",
    "rbac/prometheus_role.yaml",
    "rbac/prometheus_rolebinding.yaml",
    "rbac/kube_rbac_proxy_role.yaml",
    "rbac/kube_rbac_proxy_binding.yaml",
];

const SERVICE_MONITOR_ASSET: &str = "servicemonitor.yaml";

const GUEST_ASSETS: [&str; 5] = [
    "storageclass_gp2.yaml",
    "csidriver.yaml",
    "node_sa.yaml",
    "rbac/privileged_role.yaml",
    "rbac/node_privileged_binding.yaml",
];

const GP3_STORAGE_CLASS_ASSET: &str = "storageclass_gp3.yaml";
const SNAPSHOT_CLASS_ASSET: &str = "volumesnapshotclass.yaml";
const CONTROLLER_ASSET: &str = "controller.yaml";
const NODE_ASSET: &str = "node.yaml";

/// Everything `main` needs to run the operator.
pub struct OperatorContext {
    pub topology: Topology,
    pub status: SharedStatus,
    pub orchestrator: Orchestrator,
    pub app_state: AppState,
}

fn named(name: &str) -> watcher::Config {
    watcher::Config::default().fields(&format!("metadata.name={name}"))
}

/// Caches of the cluster running the controller Deployment.
struct ManagementCaches {
    config_maps: Informer<ConfigMap>,
    secrets: Informer<Secret>,
    cloud_config_source: Option<Informer<ConfigMap>>,
}

/// Caches of the cluster running the driver.
struct WorkloadCaches {
    operator: Informer<ClusterCSIDriver>,
    infrastructure: Informer<Infrastructure>,
    nodes: Informer<Node>,
    config_maps: Informer<ConfigMap>,
    proxy: Informer<Proxy>,
    storage_classes: Informer<StorageClass>,
}

pub async fn build(
    config: &OperatorConfig,
    log_filter: Arc<dyn LogFilterSink>,
    cancel: &CancellationToken,
) -> Result<OperatorContext, AppError> {
    let topology = config.topology();
    info!(?topology, namespace = %config.namespace, "Wiring operator");

    let management = build_kube_client().await?;
    let guest = match config.guest_kubeconfig.as_deref() {
        Some(path) if topology.is_hosted() => build_guest_kube_client(path).await?,
        _ => management.clone(),
    };

    let mgmt_caches = ManagementCaches {
        config_maps: Informer::spawn(
            Api::namespaced(management.clone(), &config.namespace),
            watcher::Config::default(),
            cancel.child_token(),
        ),
        secrets: Informer::spawn(
            Api::namespaced(management.clone(), &config.namespace),
            named(CREDENTIALS_SECRET),
            cancel.child_token(),
        ),
        cloud_config_source: (!topology.is_hosted()).then(|| {
            Informer::spawn(
                Api::namespaced(management.clone(), CLOUD_CONFIG_SOURCE_NAMESPACE),
                named(CLOUD_CONFIG),
                cancel.child_token(),
            )
        }),
    };

    let guest_caches = WorkloadCaches {
        operator: Informer::spawn(Api::all(guest.clone()), named(CLUSTER_CSI_DRIVER_NAME), cancel.child_token()),
        infrastructure: Informer::spawn(Api::all(guest.clone()), named(INFRASTRUCTURE_NAME), cancel.child_token()),
        nodes: Informer::spawn(Api::all(guest.clone()), watcher::Config::default(), cancel.child_token()),
        config_maps: Informer::spawn(
            Api::namespaced(guest.clone(), &config.guest_namespace),
            named(TRUSTED_CA_CONFIG_MAP),
            cancel.child_token(),
        ),
        proxy: Informer::spawn(Api::all(guest.clone()), named(PROXY_NAME), cancel.child_token()),
        storage_classes: Informer::spawn(Api::all(guest.clone()), watcher::Config::default(), cancel.child_token()),
    };

    let status = ControllerStatusManager::in_memory();
    let resync = config.resync_interval();
    let operator: Arc<dyn OperatorSource> = Arc::new(CachedOperator::new(
        guest_caches.operator.store(),
        CLUSTER_CSI_DRIVER_NAME,
    ));

    let management_domain = management_domain(
        config,
        topology,
        &management,
        &guest,
        &mgmt_caches,
        &guest_caches,
        operator.clone(),
        log_filter,
        resync,
    )?;
    let workload_domain = workload_domain(config, &guest, &guest_caches, operator, status.clone(), resync)?;

    let orchestrator = Orchestrator::new(status.clone())
        .with_domain(management_domain)
        .with_domain(workload_domain);

    Ok(OperatorContext {
        topology,
        status: status.clone(),
        orchestrator,
        app_state: AppState::new(status, topology, cancel.clone()),
    })
}

#[allow(clippy::too_many_arguments)]
fn management_domain(
    config: &OperatorConfig,
    topology: Topology,
    client: &Client,
    guest_client: &Client,
    mgmt: &ManagementCaches,
    guest: &WorkloadCaches,
    operator: Arc<dyn OperatorSource>,
    log_filter: Arc<dyn LogFilterSink>,
    resync: std::time::Duration,
) -> Result<Domain, AppError> {
    let manifests = FsManifestSource::new(&config.assets_dir).with_namespace(config.namespace.clone());
    let applier: Arc<dyn ResourceApplier> = Arc::new(KubeApplier::new(client.clone()));

    let mut resources = StaticResource::load_all(&manifests, &CONTROL_PLANE_ASSETS)?;
    if !topology.is_hosted() {
        resources.extend(StaticResource::load_all(&manifests, &STANDALONE_CONTROL_PLANE_ASSETS)?);
        resources.push(StaticResource::load(&manifests, SERVICE_MONITOR_ASSET)?.ignoring_not_found());
    }
    let static_resources = StaticResourcesController::new(
        "AWSEBSDriverControlPlaneStaticResourcesController",
        resources,
        operator.clone(),
        applier.clone(),
    );

    let pipeline = controller_pipeline(
        topology,
        &PipelineSettings {
            namespace: config.namespace.clone(),
            token_minter_image: config.token_minter_image.clone(),
            credentials_secret: CREDENTIALS_SECRET.to_string(),
        },
    )?;
    let cluster_state = CachedClusterState {
        names: ClusterStateNames {
            namespace: config.namespace.clone(),
            credentials_secret: Some(CREDENTIALS_SECRET.to_string()),
            custom_ca_config_map: (!topology.is_hosted()).then(|| CLOUD_CONFIG.to_string()),
            trusted_ca_config_map: Some(TRUSTED_CA_CONFIG_MAP.to_string()),
        },
        infrastructure: guest.infrastructure.store(),
        nodes: guest.nodes.store(),
        config_maps: mgmt.config_maps.store(),
        secrets: Some(mgmt.secrets.store()),
    };
    let controller = WorkloadController::new(
        "AWSEBSDriverControllerServiceController",
        WorkloadTemplate::deployment(&manifests, CONTROLLER_ASSET)?,
        pipeline,
        operator.clone(),
        Arc::new(cluster_state),
        applier.clone(),
    );

    let management_state = ManagementStateController::new(OPERAND_NAME, operator.clone());
    let log_level = LogLevelController::new(operator.clone(), log_filter);
    let observer = ConfigObserverController::new(
        "AWSEBSDriverCSIConfigObserverController",
        Arc::new(CachedProxy::new(guest.proxy.store(), PROXY_NAME)),
        operator.clone(),
        Arc::new(KubeOperatorClient::new(guest_client.clone(), CLUSTER_CSI_DRIVER_NAME)),
    );

    let mut domain = Domain::new(DomainKind::ManagementPlane)
        .with_cache(mgmt.config_maps.synced())
        .with_cache(mgmt.secrets.synced())
        .with_cache(guest.operator.synced())
        .with_cache(guest.infrastructure.synced())
        .with_cache(guest.nodes.synced())
        .with_cache(guest.proxy.synced())
        .with_loop(ControllerLoop::new(Arc::new(management_state), resync).watching(guest.operator.subscribe()))
        .with_loop(ControllerLoop::new(Arc::new(log_level), resync).watching(guest.operator.subscribe()))
        .with_loop(
            ControllerLoop::new(Arc::new(observer), resync)
                .watching(guest.operator.subscribe())
                .watching(guest.proxy.subscribe()),
        )
        .with_loop(
            ControllerLoop::new(Arc::new(static_resources), resync).watching(guest.operator.subscribe()),
        )
        .with_loop(
            ControllerLoop::new(Arc::new(controller), resync)
                .watching(guest.operator.subscribe())
                .watching(guest.infrastructure.subscribe())
                .watching(guest.nodes.subscribe())
                .watching(mgmt.config_maps.subscribe())
                .watching(mgmt.secrets.subscribe()),
        );

    if let Some(source) = &mgmt.cloud_config_source {
        let mirror = ConfigMirrorController::new(
            "CloudConfigSyncController",
            ConfigMirrorEntry::new(
                ResourceLocation::new(CLOUD_CONFIG_SOURCE_NAMESPACE, CLOUD_CONFIG),
                ResourceLocation::new(config.namespace.clone(), CLOUD_CONFIG),
            ),
            Arc::new(CachedConfigMaps::new(source.store())),
            applier,
        );
        domain = domain
            .with_cache(source.synced())
            .with_loop(ControllerLoop::new(Arc::new(mirror), resync).watching(source.subscribe()));
    }

    Ok(domain)
}

fn workload_domain(
    config: &OperatorConfig,
    client: &Client,
    guest: &WorkloadCaches,
    operator: Arc<dyn OperatorSource>,
    status: SharedStatus,
    resync: std::time::Duration,
) -> Result<Domain, AppError> {
    let manifests = FsManifestSource::new(&config.assets_dir).with_namespace(config.guest_namespace.clone());
    let applier: Arc<dyn ResourceApplier> = Arc::new(KubeApplier::new(client.clone()));

    let static_resources = StaticResourcesController::new(
        "AWSEBSDriverStaticResourcesController",
        StaticResource::load_all(&manifests, &GUEST_ASSETS)?,
        operator.clone(),
        applier.clone(),
    );

    let snapshot_class = ConditionalResourcesController::new(
        "VolumeSnapshotClassController",
        ResourceGate::new(
            SNAPSHOT_CLASS_ASSET,
            CrdExists::new(Arc::new(KubeCapabilityProbe::new(client.clone())), SNAPSHOT_CLASS_CRD),
        ),
        vec![StaticResource::load(&manifests, SNAPSHOT_CLASS_ASSET)?],
        operator.clone(),
        applier.clone(),
    );

    let node_state = CachedClusterState {
        names: ClusterStateNames {
            namespace: config.guest_namespace.clone(),
            credentials_secret: None,
            custom_ca_config_map: None,
            trusted_ca_config_map: Some(TRUSTED_CA_CONFIG_MAP.to_string()),
        },
        infrastructure: guest.infrastructure.store(),
        nodes: guest.nodes.store(),
        config_maps: guest.config_maps.store(),
        secrets: None,
    };
    let node = WorkloadController::new(
        "AWSEBSDriverNodeServiceController",
        WorkloadTemplate::daemon_set(&manifests, NODE_ASSET)?,
        node_pipeline(),
        operator.clone(),
        Arc::new(node_state),
        applier.clone(),
    );

    let gp3 = StorageClassController::new(
        "AWSEBSDriverStorageClassController",
        StaticResource::load(&manifests, GP3_STORAGE_CLASS_ASSET)?,
        Arc::new(CachedStorageClasses::new(guest.storage_classes.store())),
        operator.clone(),
        applier,
    );

    let publisher = OperatorStatusController::new(
        status,
        operator,
        Arc::new(KubeOperatorClient::new(client.clone(), CLUSTER_CSI_DRIVER_NAME)),
    );

    Ok(Domain::new(DomainKind::WorkloadPlane)
        .with_cache(guest.operator.synced())
        .with_cache(guest.infrastructure.synced())
        .with_cache(guest.nodes.synced())
        .with_cache(guest.config_maps.synced())
        .with_cache(guest.storage_classes.synced())
        .with_loop(ControllerLoop::new(Arc::new(static_resources), resync).watching(guest.operator.subscribe()))
        .with_loop(ControllerLoop::new(Arc::new(snapshot_class), resync).watching(guest.operator.subscribe()))
        .with_loop(
            ControllerLoop::new(Arc::new(node), resync)
                .watching(guest.operator.subscribe())
                .watching(guest.config_maps.subscribe()),
        )
        .with_loop(
            ControllerLoop::new(Arc::new(gp3), resync)
                .watching(guest.operator.subscribe())
                .watching(guest.storage_classes.subscribe()),
        )
        .with_loop(ControllerLoop::new(Arc::new(publisher), resync)))
}
