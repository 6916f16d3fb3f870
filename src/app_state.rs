use tokio_util::sync::CancellationToken;

use crate::core::state::runtime::controllers::controller_status_manager::SharedStatus;
use crate::domain::topology::Topology;

#[derive(Clone)]
pub struct AppState {
    pub status: SharedStatus,
    pub topology: Topology,
    /// Root cancellation token; once cancelled the process reports not live.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(status: SharedStatus, topology: Topology, shutdown: CancellationToken) -> Self {
        Self {
            status,
            topology,
            shutdown,
        }
    }
}
