pub mod conditional_resources;
pub mod config_mirror;
pub mod config_observer;
pub mod log_level;
pub mod management_state;
pub mod operator_status;
pub mod static_resources;
pub mod storage_class;
pub mod workload;

use tracing::debug;

use crate::core::client::kube_resources::ClusterCSIDriverSpec;
use crate::core::client::listers::OperatorSource;

/// Operator spec when the operand should be reconciled; `None` skips the tick.
pub(crate) fn managed_spec(controller: &str, operator: &dyn OperatorSource) -> Option<ClusterCSIDriverSpec> {
    let Some(cr) = operator.operator() else {
        debug!(controller, "operator resource not cached yet, skipping");
        return None;
    };
    if !cr.spec.is_managed() {
        debug!(controller, state = %cr.spec.management_state, "operand not managed, skipping");
        return None;
    }
    Some(cr.spec)
}
