use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::core::client::listers::OperatorSource;
use crate::errors::AppError;
use crate::scheduler::controller_loop::Reconciler;

/// Reports a management state the operator cannot honour.
///
/// `Removed` would mean uninstalling the driver, which this operator never
/// does; the controller stays failed (and `ManagementStateDegraded`) until the
/// state is changed back.
pub struct ManagementStateController {
    operand: String,
    operator: Arc<dyn OperatorSource>,
}

impl ManagementStateController {
    pub fn new(operand: impl Into<String>, operator: Arc<dyn OperatorSource>) -> Self {
        Self {
            operand: operand.into(),
            operator,
        }
    }
}

#[async_trait]
impl Reconciler for ManagementStateController {
    fn name(&self) -> &str {
        "ManagementState"
    }

    async fn sync(&self) -> Result<()> {
        let Some(cr) = self.operator.operator() else {
            debug!(controller = "ManagementState", "operator resource not cached yet, skipping");
            return Ok(());
        };

        if !cr.spec.supports_management_state() {
            return Err(AppError::ConfigurationError(format!(
                "management state {:?} is not supported for {}",
                cr.spec.management_state, self.operand
            ))
            .into());
        }
        Ok(())
    }
}
