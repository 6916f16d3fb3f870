use std::sync::Arc;
use tokio::sync::RwLock;

use crate::core::state::runtime::controllers::controller_status_repository_trait::ControllerStatusRepositoryTrait;
use crate::core::state::runtime::controllers::controller_status_state::ControllerStatusState;

#[derive(Default)]
pub struct ControllerStatusRepository {
    state: RwLock<Arc<ControllerStatusState>>,
}

impl ControllerStatusRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait::async_trait]
impl ControllerStatusRepositoryTrait for ControllerStatusRepository {
    /// Readers get the current Arc; writers swap in a new one.
    async fn get(&self) -> Arc<ControllerStatusState> {
        self.state.read().await.clone()
    }

    async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ControllerStatusState) + Send + Sync,
    {
        let mut guard = self.state.write().await;

        let mut next = (**guard).clone();
        f(&mut next);

        *guard = Arc::new(next);
    }
}
