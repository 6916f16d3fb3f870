use kube::runtime::reflector::Store;
use kube::ResourceExt;
use tracing::debug;

use crate::core::client::kube_resources::{ConfigMap, Infrastructure, Node, Secret};
use crate::core::client::openshift::INFRASTRUCTURE_NAME;
use crate::core::client::store::lookup;
use crate::core::state::cluster::cluster_state::{
    custom_ca_bundle_name, secret_hash, trusted_ca_bundle_hash, ClusterState,
};

/// Produces the snapshot a pipeline run reads from.
pub trait ClusterStateSource: Send + Sync {
    fn snapshot(&self) -> ClusterState;
}

/// Names of the objects a snapshot is assembled from.
#[derive(Debug, Clone)]
pub struct ClusterStateNames {
    pub namespace: String,
    pub credentials_secret: Option<String>,
    pub custom_ca_config_map: Option<String>,
    pub trusted_ca_config_map: Option<String>,
}

/// Snapshot assembled from informer caches only; never calls the API server.
pub struct CachedClusterState {
    pub names: ClusterStateNames,
    pub infrastructure: Store<Infrastructure>,
    pub nodes: Store<Node>,
    pub config_maps: Store<ConfigMap>,
    pub secrets: Option<Store<Secret>>,
}

impl ClusterStateSource for CachedClusterState {
    fn snapshot(&self) -> ClusterState {
        let namespace = self.names.namespace.as_str();
        let mut state = ClusterState::default();

        match lookup(&self.infrastructure, None, INFRASTRUCTURE_NAME) {
            Ok(infra) => state.apply_infrastructure(&infra),
            Err(e) => debug!(error = %e, "No platform metadata"),
        }

        if let Some(name) = self.names.custom_ca_config_map.as_deref() {
            match lookup(&self.config_maps, Some(namespace), name) {
                Ok(cm) => state.custom_ca_bundle = custom_ca_bundle_name(&cm),
                Err(e) => debug!(error = %e, "No custom CA bundle"),
            }
        }

        if let Some(name) = self.names.trusted_ca_config_map.as_deref() {
            match lookup(&self.config_maps, Some(namespace), name) {
                Ok(cm) => state.trusted_ca_bundle_hash = trusted_ca_bundle_hash(&cm),
                Err(e) => debug!(error = %e, "No trusted CA bundle"),
            }
        }

        if let (Some(secrets), Some(name)) = (&self.secrets, self.names.credentials_secret.as_deref()) {
            match lookup(secrets, Some(namespace), name) {
                Ok(secret) => state.credentials_hash = Some(secret_hash(&secret)),
                Err(e) => debug!(error = %e, "No credentials secret"),
            }
        }

        state.node_labels = self
            .nodes
            .state()
            .iter()
            .map(|node| node.labels().clone())
            .collect();

        state
    }
}
