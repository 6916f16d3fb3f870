//! Hooks that only apply when the operator runs in the cluster it serves.

use serde_json::json;

use crate::core::client::kube_resources::Volume;
use crate::domain::hooks::{HookContext, WorkloadHook, DRIVER_CONTAINER};
use crate::domain::workload::container_ext::read_only_mount;
use crate::domain::workload::{ContainerExt, WorkloadSpec};
use crate::errors::{internal_error, AppError};

pub const CA_BUNDLE_VOLUME: &str = "ca-bundle";
pub const CA_BUNDLE_DIR: &str = "/etc/ca";
pub const CA_BUNDLE_PATH: &str = "/etc/ca/ca-bundle.pem";

/// Two replicas when the selector matches more than one node, otherwise one.
pub struct NodeReplicasHook;

impl WorkloadHook for NodeReplicasHook {
    fn name(&self) -> &'static str {
        "ControllerReplicas"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let nodes = ctx.cluster.count_nodes_matching(&spec.node_selector());
        spec.set_replicas(if nodes > 1 { 2 } else { 1 });
        Ok(spec)
    }
}

pub struct CustomCaBundleHook;

impl CustomCaBundleHook {
    fn volume(config_map: &str) -> Result<Volume, AppError> {
        serde_json::from_value(json!({
            "name": CA_BUNDLE_VOLUME,
            "configMap": { "name": config_map }
        }))
        .map_err(internal_error)
    }
}

impl WorkloadHook for CustomCaBundleHook {
    fn name(&self) -> &'static str {
        "CustomCABundle"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let Some(config_map) = ctx.cluster.custom_ca_bundle.as_deref() else {
            return Ok(spec);
        };

        let driver = spec.require_container(self.name(), DRIVER_CONTAINER)?;
        driver.upsert_env("AWS_CA_BUNDLE", CA_BUNDLE_PATH);
        driver.upsert_volume_mount(read_only_mount(CA_BUNDLE_VOLUME, CA_BUNDLE_DIR));

        spec.upsert_volume(Self::volume(config_map)?);
        Ok(spec)
    }
}
