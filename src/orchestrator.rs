//! Runs the management-plane and workload-plane controllers side by side.

use anyhow::{anyhow, Result};
use futures::future::try_join_all;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::client::store::CacheSync;
use crate::core::state::runtime::controllers::controller_status_manager::SharedStatus;
use crate::scheduler::controller_loop::ControllerLoop;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    ManagementPlane,
    WorkloadPlane,
}

impl DomainKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DomainKind::ManagementPlane => "management-plane",
            DomainKind::WorkloadPlane => "workload-plane",
        }
    }
}

/// Controllers that share a cluster, plus the caches they read.
pub struct Domain {
    pub kind: DomainKind,
    pub caches: Vec<CacheSync>,
    pub loops: Vec<ControllerLoop>,
}

impl Domain {
    pub fn new(kind: DomainKind) -> Self {
        Self {
            kind,
            caches: Vec::new(),
            loops: Vec::new(),
        }
    }

    pub fn with_cache(mut self, cache: CacheSync) -> Self {
        self.caches.push(cache);
        self
    }

    pub fn with_loop(mut self, controller: ControllerLoop) -> Self {
        self.loops.push(controller);
        self
    }

    /// Wait for the caches, then run every loop until cancelled.
    async fn run(self, status: SharedStatus, cancel: CancellationToken) {
        let domain = self.kind.as_str();

        for controller in &self.loops {
            status.register(controller.name(), domain).await;
        }

        info!(domain, caches = self.caches.len(), "Waiting for informer caches");
        tokio::select! {
            _ = cancel.cancelled() => return,
            synced = try_join_all(self.caches) => {
                if let Err(err) = synced {
                    error!(domain, error = %err, "cache sync failed, domain not started");
                    return;
                }
            }
        }
        info!(domain, loops = self.loops.len(), "Caches synced, starting controllers");

        let mut loops = JoinSet::new();
        for controller in self.loops {
            loops.spawn(controller.run(status.clone(), cancel.clone()));
        }
        while loops.join_next().await.is_some() {}
    }
}

pub struct Orchestrator {
    domains: Vec<Domain>,
    status: SharedStatus,
}

impl Orchestrator {
    pub fn new(status: SharedStatus) -> Self {
        Self {
            domains: Vec::new(),
            status,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domains.push(domain);
        self
    }

    /// Runs until `cancel` fires. Stopping is always reported as an error:
    /// the process is expected to exit and be restarted.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut domains = JoinSet::new();
        for domain in self.domains {
            let kind = domain.kind;
            let status = self.status.clone();
            let child = cancel.child_token();
            domains.spawn(async move {
                domain.run(status, child).await;
                kind
            });
        }

        cancel.cancelled().await;
        self.status.mark_stopped().await;

        while let Some(done) = domains.join_next().await {
            match done {
                Ok(kind) => info!(domain = kind.as_str(), "Domain stopped"),
                Err(err) => error!(error = %err, "domain task panicked"),
            }
        }

        Err(anyhow!("orchestrator stopped"))
    }
}
