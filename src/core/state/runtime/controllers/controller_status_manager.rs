use std::sync::Arc;
use chrono::Utc;

use crate::core::state::runtime::controllers::controller_status_repository::ControllerStatusRepository;
use crate::core::state::runtime::controllers::controller_status_repository_trait::ControllerStatusRepositoryTrait;
use crate::core::state::runtime::controllers::controller_status_state::ControllerStatusState;

/// Status manager used by the running process.
pub type SharedStatus = Arc<ControllerStatusManager<ControllerStatusRepository>>;

pub struct ControllerStatusManager<R: ControllerStatusRepositoryTrait> {
    pub(crate) repo: Arc<R>,
}

impl ControllerStatusManager<ControllerStatusRepository> {
    pub fn in_memory() -> SharedStatus {
        Arc::new(Self::new(ControllerStatusRepository::new().shared()))
    }
}

impl<R: ControllerStatusRepositoryTrait> ControllerStatusManager<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Make a controller visible before its first sync.
    pub async fn register(&self, controller: &str, domain: &str) {
        let now = Utc::now();
        self.repo
            .update(|state| state.register(controller, domain, now))
            .await;
    }

    pub async fn mark_synced(&self, controller: &str) {
        let now = Utc::now();
        self.repo
            .update(|state| state.mark_synced(controller, now))
            .await;
    }

    pub async fn mark_failed(&self, controller: &str, message: String) {
        let now = Utc::now();
        self.repo
            .update(|state| state.mark_failed(controller, message, now))
            .await;
    }

    pub async fn mark_stopped(&self) {
        self.repo.update(|state| state.stopped = true).await;
    }

    pub async fn snapshot(&self) -> Arc<ControllerStatusState> {
        self.repo.get().await
    }

    pub async fn is_ready(&self) -> bool {
        self.repo.get().await.is_ready()
    }

    pub async fn is_degraded(&self, controller: &str) -> bool {
        self.repo
            .get()
            .await
            .controllers
            .get(controller)
            .map(|c| c.degraded)
            .unwrap_or(false)
    }
}
