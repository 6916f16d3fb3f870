//! Deployment mutation hooks.
//!
//! A hook takes an owned `WorkloadSpec`, edits it and hands it back. Hooks only
//! read already-resolved state from `HookContext`; none of them block or talk
//! to the API server.

pub mod common;
pub mod hosted;
pub mod pipeline;
pub mod standalone;

use crate::core::client::kube_resources::ClusterCSIDriverSpec;
use crate::core::state::cluster::cluster_state::ClusterState;
use crate::domain::workload::WorkloadSpec;
use crate::errors::AppError;

pub use pipeline::HookPipeline;

/// Container every driver-specific hook targets.
pub const DRIVER_CONTAINER: &str = "csi-driver";

pub struct HookContext<'a> {
    pub operator: &'a ClusterCSIDriverSpec,
    pub cluster: &'a ClusterState,
}

pub trait WorkloadHook: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError>;
}
