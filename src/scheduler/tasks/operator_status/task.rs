use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::core::client::kube_resources::OperatorCondition;
use crate::core::client::listers::OperatorSource;
use crate::core::client::operator_client::OperatorStatusWriter;
use crate::core::state::runtime::controllers::controller_status_manager::SharedStatus;
use crate::core::state::runtime::controllers::controller_status_state::ControllerStatusState;
use crate::scheduler::controller_loop::Reconciler;

/// Publishes controller health as `<Controller>Degraded` conditions.
pub struct OperatorStatusController {
    status: SharedStatus,
    operator: Arc<dyn OperatorSource>,
    writer: Arc<dyn OperatorStatusWriter>,
}

impl OperatorStatusController {
    pub fn new(
        status: SharedStatus,
        operator: Arc<dyn OperatorSource>,
        writer: Arc<dyn OperatorStatusWriter>,
    ) -> Self {
        Self {
            status,
            operator,
            writer,
        }
    }
}

pub fn build_conditions(state: &ControllerStatusState) -> Vec<OperatorCondition> {
    state
        .controllers
        .values()
        .map(|c| OperatorCondition {
            type_: format!("{}Degraded", c.controller),
            status: if c.degraded { "True" } else { "False" }.to_string(),
            reason: Some(if c.degraded { "SyncError" } else { "AsExpected" }.to_string()),
            message: c.message.clone(),
            last_transition_time: Some(c.last_transition_at.to_rfc3339()),
        })
        .collect()
}

#[async_trait]
impl Reconciler for OperatorStatusController {
    fn name(&self) -> &str {
        "OperatorStatus"
    }

    async fn sync(&self) -> Result<()> {
        if self.operator.operator().is_none() {
            debug!(controller = "OperatorStatus", "operator resource not cached yet, skipping");
            return Ok(());
        }

        let snapshot = self.status.snapshot().await;
        let conditions = build_conditions(&snapshot);
        self.writer
            .write_conditions(&conditions)
            .await
            .context("failed to publish operator conditions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::runtime::controllers::controller_status_manager::ControllerStatusManager;
    use crate::test_support::{operator, FakeStatusWriter, FixedOperator};

    #[tokio::test]
    async fn degraded_controllers_become_true_conditions() {
        let status = ControllerStatusManager::in_memory();
        status.register("StaticResources", "management-plane").await;
        status.register("Node", "workload-plane").await;
        status.mark_failed("Node", "apply failed".into()).await;

        let writer = Arc::new(FakeStatusWriter::default());
        let ctrl = OperatorStatusController::new(
            status,
            Arc::new(FixedOperator(Some(operator("Managed")))),
            writer.clone(),
        );
        ctrl.sync().await.unwrap();

        let written = writer.last().unwrap();
        let node = written.iter().find(|c| c.type_ == "NodeDegraded").unwrap();
        assert_eq!(node.status, "True");
        assert_eq!(node.reason.as_deref(), Some("SyncError"));
        assert_eq!(node.message.as_deref(), Some("apply failed"));

        let static_ = written.iter().find(|c| c.type_ == "StaticResourcesDegraded").unwrap();
        assert_eq!(static_.status, "False");
    }

    #[tokio::test]
    async fn nothing_is_written_without_the_operator_resource() {
        let writer = Arc::new(FakeStatusWriter::default());
        let ctrl = OperatorStatusController::new(
            ControllerStatusManager::in_memory(),
            Arc::new(FixedOperator(None)),
            writer.clone(),
        );
        ctrl.sync().await.unwrap();
        assert!(writer.last().is_none());
    }
}
