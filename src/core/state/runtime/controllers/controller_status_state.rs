use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health of one controller loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerCondition {
    pub controller: String,

    /// Which domain the controller reconciles (management or workload plane).
    pub domain: String,

    /// True while the last sync failed
    pub degraded: bool,

    /// Last failure message (cleared on success)
    pub message: Option<String>,

    pub consecutive_failures: u32,

    pub last_sync_at: Option<DateTime<Utc>>,

    /// When `degraded` last flipped
    pub last_transition_at: DateTime<Utc>,
}

/// In-memory status of every registered controller loop.
///
/// This state:
/// - lives only in memory (NOT persisted)
/// - is written by the loops after each sync
/// - is read by the status publisher and the HTTP health endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerStatusState {
    pub controllers: BTreeMap<String, ControllerCondition>,

    /// Set once the root cancellation signal fired.
    pub stopped: bool,
}

impl ControllerStatusState {
    pub fn register(&mut self, controller: &str, domain: &str, now: DateTime<Utc>) {
        self.controllers
            .entry(controller.to_string())
            .or_insert_with(|| ControllerCondition {
                controller: controller.to_string(),
                domain: domain.to_string(),
                degraded: false,
                message: None,
                consecutive_failures: 0,
                last_sync_at: None,
                last_transition_at: now,
            });
    }

    pub fn mark_synced(&mut self, controller: &str, now: DateTime<Utc>) {
        let entry = self.entry(controller, now);
        if entry.degraded {
            entry.last_transition_at = now;
        }
        entry.degraded = false;
        entry.message = None;
        entry.consecutive_failures = 0;
        entry.last_sync_at = Some(now);
    }

    pub fn mark_failed(&mut self, controller: &str, message: String, now: DateTime<Utc>) {
        let entry = self.entry(controller, now);
        if !entry.degraded {
            entry.last_transition_at = now;
        }
        entry.degraded = true;
        entry.message = Some(message);
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
    }

    pub fn is_ready(&self) -> bool {
        !self.stopped && self.controllers.values().all(|c| !c.degraded)
    }

    fn entry(&mut self, controller: &str, now: DateTime<Utc>) -> &mut ControllerCondition {
        self.controllers
            .entry(controller.to_string())
            .or_insert_with(|| ControllerCondition {
                controller: controller.to_string(),
                domain: String::new(),
                degraded: false,
                message: None,
                consecutive_failures: 0,
                last_sync_at: None,
                last_transition_at: now,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn transitions_are_recorded_only_on_flips() {
        let t0 = Utc::now();
        let mut state = ControllerStatusState::default();
        state.register("NodeService", "workload-plane", t0);
        assert!(state.is_ready());

        let t1 = t0 + Duration::seconds(1);
        state.mark_failed("NodeService", "boom".into(), t1);
        let t2 = t1 + Duration::seconds(1);
        state.mark_failed("NodeService", "boom again".into(), t2);

        let cond = &state.controllers["NodeService"];
        assert!(cond.degraded);
        assert_eq!(cond.consecutive_failures, 2);
        assert_eq!(cond.last_transition_at, t1);
        assert_eq!(cond.message.as_deref(), Some("boom again"));
        assert!(!state.is_ready());

        let t3 = t2 + Duration::seconds(1);
        state.mark_synced("NodeService", t3);
        let cond = &state.controllers["NodeService"];
        assert!(!cond.degraded);
        assert_eq!(cond.consecutive_failures, 0);
        assert_eq!(cond.last_transition_at, t3);
        assert!(state.is_ready());
    }

    #[test]
    fn stopped_state_is_never_ready() {
        let mut state = ControllerStatusState::default();
        state.stopped = true;
        assert!(!state.is_ready());
    }
}
