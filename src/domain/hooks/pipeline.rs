use tracing::debug;

use crate::core::client::kube_resources::{ClusterCSIDriverSpec, DaemonSet, Deployment};
use crate::core::state::cluster::cluster_state::ClusterState;
use crate::domain::hooks::{HookContext, WorkloadHook};
use crate::domain::workload::WorkloadSpec;
use crate::errors::AppError;

/// Ordered, fail-fast list of hooks.
#[derive(Default)]
pub struct HookPipeline {
    hooks: Vec<Box<dyn WorkloadHook>>,
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: impl WorkloadHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn hook_names(&self) -> Vec<&'static str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Run every hook, in order, on a private copy of `base`.
    pub fn apply(&self, base: &WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        self.hooks.iter().try_fold(base.clone(), |spec, hook| {
            debug!(hook = hook.name(), "applying hook");
            hook.apply(spec, ctx)
        })
    }

    /// Entry point for the deployment controller.
    pub fn finalize(
        &self,
        operator: &ClusterCSIDriverSpec,
        base: &Deployment,
        cluster: &ClusterState,
    ) -> Result<Deployment, AppError> {
        let ctx = HookContext { operator, cluster };
        let base = WorkloadSpec::from_deployment(base.clone());
        self.apply(&base, &ctx)?.into_deployment()
    }

    pub fn finalize_daemon_set(
        &self,
        operator: &ClusterCSIDriverSpec,
        base: &DaemonSet,
        cluster: &ClusterState,
    ) -> Result<DaemonSet, AppError> {
        let ctx = HookContext { operator, cluster };
        let base = WorkloadSpec::from_daemon_set(base.clone());
        self.apply(&base, &ctx)?.into_daemon_set()
    }
}
