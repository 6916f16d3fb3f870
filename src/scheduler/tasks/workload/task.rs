use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::core::client::applier::ResourceApplier;
use crate::core::client::kube_resources::{DaemonSet, Deployment};
use crate::core::client::listers::OperatorSource;
use crate::core::client::manifests::ManifestSource;
use crate::core::state::cluster::cluster_state_source::ClusterStateSource;
use crate::domain::hooks::HookPipeline;
use crate::errors::{wiring_error, AppError};
use crate::scheduler::controller_loop::Reconciler;
use crate::scheduler::tasks::managed_spec;

/// Pristine template, read once at startup.
#[derive(Debug, Clone)]
pub enum WorkloadTemplate {
    Deployment(Deployment),
    DaemonSet(DaemonSet),
}

impl WorkloadTemplate {
    pub fn deployment(manifests: &dyn ManifestSource, file: &str) -> Result<Self, AppError> {
        let value = manifests.read(file).map_err(|e| wiring_error(file, format!("{e:#}")))?;
        serde_json::from_value(value)
            .map(WorkloadTemplate::Deployment)
            .map_err(|e| wiring_error(file, e))
    }

    pub fn daemon_set(manifests: &dyn ManifestSource, file: &str) -> Result<Self, AppError> {
        let value = manifests.read(file).map_err(|e| wiring_error(file, format!("{e:#}")))?;
        serde_json::from_value(value)
            .map(WorkloadTemplate::DaemonSet)
            .map_err(|e| wiring_error(file, e))
    }
}

/// Renders a workload template through a hook pipeline and applies it.
pub struct WorkloadController {
    name: String,
    template: WorkloadTemplate,
    pipeline: HookPipeline,
    operator: Arc<dyn OperatorSource>,
    cluster: Arc<dyn ClusterStateSource>,
    applier: Arc<dyn ResourceApplier>,
}

impl WorkloadController {
    pub fn new(
        name: impl Into<String>,
        template: WorkloadTemplate,
        pipeline: HookPipeline,
        operator: Arc<dyn OperatorSource>,
        cluster: Arc<dyn ClusterStateSource>,
        applier: Arc<dyn ResourceApplier>,
    ) -> Self {
        Self {
            name: name.into(),
            template,
            pipeline,
            operator,
            cluster,
            applier,
        }
    }
}

#[async_trait]
impl Reconciler for WorkloadController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        let Some(spec) = managed_spec(&self.name, self.operator.as_ref()) else {
            return Ok(());
        };
        let cluster = self.cluster.snapshot();

        match &self.template {
            WorkloadTemplate::Deployment(base) => {
                let deployment = self
                    .pipeline
                    .finalize(&spec, base, &cluster)
                    .context("failed to render deployment")?;
                self.applier.apply_deployment(&deployment).await?;
            }
            WorkloadTemplate::DaemonSet(base) => {
                let daemon_set = self
                    .pipeline
                    .finalize_daemon_set(&spec, base, &cluster)
                    .context("failed to render daemon set")?;
                self.applier.apply_daemon_set(&daemon_set).await?;
            }
        }

        debug!(controller = %self.name, "workload applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::cluster::cluster_state::ClusterState;
    use crate::domain::hooks::standalone::CustomCaBundleHook;
    use crate::domain::topology::node_pipeline;
    use crate::test_support::{
        container, deployment_with, operator, FakeApplier, FixedClusterState, FixedOperator,
    };

    fn controller(
        template: WorkloadTemplate,
        pipeline: HookPipeline,
        op: FixedOperator,
        cluster: ClusterState,
        applier: Arc<FakeApplier>,
    ) -> WorkloadController {
        WorkloadController::new(
            "AWSEBSDriverControllerServiceController",
            template,
            pipeline,
            Arc::new(op),
            Arc::new(FixedClusterState(cluster)),
            applier,
        )
    }

    #[tokio::test]
    async fn renders_and_applies_the_deployment() {
        let applier = Arc::new(FakeApplier::default());
        let template = WorkloadTemplate::Deployment(deployment_with(vec![container("csi-driver")], vec![]));
        let cluster = ClusterState {
            custom_ca_bundle: Some("kube-cloud-config".into()),
            ..Default::default()
        };
        let ctrl = controller(
            template,
            HookPipeline::new().with_hook(CustomCaBundleHook),
            FixedOperator(Some(operator("Managed"))),
            cluster,
            applier.clone(),
        );

        ctrl.sync().await.unwrap();

        let applied = applier.deployments();
        assert_eq!(applied.len(), 1);
        let pod = applied[0].spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        assert!(pod.volumes.iter().flatten().any(|v| v.name == "ca-bundle"));
    }

    #[tokio::test]
    async fn configuration_errors_apply_nothing() {
        let applier = Arc::new(FakeApplier::default());
        let template = WorkloadTemplate::Deployment(deployment_with(vec![container("other")], vec![]));
        let cluster = ClusterState {
            custom_ca_bundle: Some("kube-cloud-config".into()),
            ..Default::default()
        };
        let ctrl = controller(
            template,
            HookPipeline::new().with_hook(CustomCaBundleHook),
            FixedOperator(Some(operator("Managed"))),
            cluster,
            applier.clone(),
        );

        let err = ctrl.sync().await.unwrap_err();
        assert!(matches!(
            err.root_cause().downcast_ref::<AppError>(),
            Some(AppError::ConfigurationError(_))
        ));
        assert!(applier.deployments().is_empty());
    }

    #[tokio::test]
    async fn unmanaged_or_missing_operator_skips() {
        for op in [FixedOperator(None), FixedOperator(Some(operator("Unmanaged")))] {
            let applier = Arc::new(FakeApplier::default());
            let template = WorkloadTemplate::Deployment(deployment_with(vec![], vec![]));
            let ctrl = controller(template, HookPipeline::new(), op, ClusterState::default(), applier.clone());
            ctrl.sync().await.unwrap();
            assert!(applier.deployments().is_empty());
        }
    }

    #[tokio::test]
    async fn daemon_sets_go_through_the_node_pipeline() {
        let applier = Arc::new(FakeApplier::default());
        let mut ds = DaemonSet::default();
        ds.metadata.name = Some("aws-ebs-csi-driver-node".into());
        let cluster = ClusterState {
            trusted_ca_bundle_hash: Some("h".into()),
            ..Default::default()
        };
        let ctrl = controller(
            WorkloadTemplate::DaemonSet(ds),
            node_pipeline(),
            FixedOperator(Some(operator("Managed"))),
            cluster,
            applier.clone(),
        );

        ctrl.sync().await.unwrap();
        let applied = applier.daemon_sets();
        let annotations = applied[0]
            .spec
            .as_ref()
            .unwrap()
            .template
            .metadata
            .as_ref()
            .unwrap()
            .annotations
            .clone()
            .unwrap();
        assert_eq!(annotations["operator.openshift.io/trusted-ca-bundle-hash"], "h");
    }
}
