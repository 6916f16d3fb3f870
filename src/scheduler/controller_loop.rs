use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::select_all;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::state::runtime::controllers::controller_status_manager::SharedStatus;

const RETRY_BASE: Duration = Duration::from_secs(1);

/// One level-triggered reconciliation step.
#[async_trait]
pub trait Reconciler: Send + Sync {
    fn name(&self) -> &str;

    async fn sync(&self) -> anyhow::Result<()>;
}

/// Runs a reconciler on every cache event and on a fixed resync period.
///
/// Events that arrive while a sync is running are coalesced into one more run.
/// A failed sync is retried with a doubling delay until it succeeds or the
/// loop is cancelled.
pub struct ControllerLoop {
    reconciler: Arc<dyn Reconciler>,
    resync: Duration,
    retry_base: Duration,
    events: Vec<watch::Receiver<u64>>,
}

impl ControllerLoop {
    pub fn new(reconciler: Arc<dyn Reconciler>, resync: Duration) -> Self {
        Self {
            reconciler,
            resync,
            retry_base: RETRY_BASE,
            events: Vec::new(),
        }
    }

    pub fn watching(mut self, events: watch::Receiver<u64>) -> Self {
        self.events.push(events);
        self
    }

    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    pub fn name(&self) -> &str {
        self.reconciler.name()
    }

    pub async fn run(mut self, status: SharedStatus, cancel: CancellationToken) {
        let name = self.reconciler.name().to_string();
        info!(controller = %name, "Starting controller loop");

        let mut ticker = tokio::time::interval(self.resync);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => debug!(controller = %name, "resync"),
                _ = next_event(&mut self.events) => debug!(controller = %name, "cache event"),
            }

            let mut failures = 0u32;
            loop {
                match self.reconciler.sync().await {
                    Ok(()) => {
                        status.mark_synced(&name).await;
                        break;
                    }
                    Err(err) => {
                        failures = failures.saturating_add(1);
                        warn!(controller = %name, failures, error = %format!("{err:#}"), "sync failed");
                        status.mark_failed(&name, format!("{err:#}")).await;
                    }
                }

                let delay = retry_delay(self.retry_base, failures, self.resync);
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!(controller = %name, "Controller loop stopped");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        debug!(controller = %name, "Controller loop stopped");
    }
}

/// `base * 2^(failures - 1)`, never above `cap`.
pub fn retry_delay(base: Duration, failures: u32, cap: Duration) -> Duration {
    let factor = 1u32.checked_shl(failures.saturating_sub(1)).unwrap_or(u32::MAX);
    base.saturating_mul(factor).min(cap)
}

/// Waits for the next change on any receiver. Closed channels are dropped;
/// with none left this never resolves.
async fn next_event(events: &mut Vec<watch::Receiver<u64>>) {
    loop {
        if events.is_empty() {
            return std::future::pending().await;
        }

        let (result, index, rest) = select_all(events.iter_mut().map(|rx| Box::pin(rx.changed()))).await;
        drop(rest);

        match result {
            Ok(()) => return,
            Err(_) => {
                events.swap_remove(index);
            }
        }
    }
}
