use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::debug;

use crate::errors::{wiring_error, AppError};

/// Creates a Kubernetes client configured for in-cluster or local development
pub async fn build_kube_client() -> Result<Client, AppError> {
    let client = Client::try_default()
        .await
        .map_err(|e| wiring_error("management cluster client", e))?;

    debug!("Management cluster client initialized");
    Ok(client)
}

/// Creates a client for the workload cluster from an explicit kubeconfig file
pub async fn build_guest_kube_client(kubeconfig: &Path) -> Result<Client, AppError> {
    let raw = Kubeconfig::read_from(kubeconfig)
        .map_err(|e| wiring_error(&format!("reading {}", kubeconfig.display()), e))?;

    let config = Config::from_custom_kubeconfig(raw, &KubeConfigOptions::default())
        .await
        .map_err(|e| wiring_error("guest cluster kubeconfig", e))?;

    let client = Client::try_from(config).map_err(|e| wiring_error("guest cluster client", e))?;

    debug!(kubeconfig = %kubeconfig.display(), "Guest cluster client initialized");
    Ok(client)
}
