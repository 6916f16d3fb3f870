//! System API DTOs
use serde::Serialize;

use crate::core::state::runtime::controllers::controller_status_state::ControllerCondition;
use crate::domain::topology::Topology;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub topology: Topology,
    pub ready: bool,
    pub stopped: bool,
    pub controllers: Vec<ControllerCondition>,
}

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    /// Degraded controllers, only filled on failed readiness.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<String>,
}
