use std::sync::Arc;
use async_trait::async_trait;

use crate::core::state::runtime::controllers::controller_status_state::ControllerStatusState;

#[async_trait]
pub trait ControllerStatusRepositoryTrait: Send + Sync {

    /// Return the current state as an Arc.
    async fn get(&self) -> Arc<ControllerStatusState>;

    /// Mutate the internal state using a closure.
    async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ControllerStatusState) + Send + Sync;
}
