use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::{json, Value};
use tracing::debug;

use crate::core::client::kube_resources::{ClusterCSIDriver, OperatorCondition};

/// Writes operator conditions to the operator's custom resource.
#[async_trait]
pub trait OperatorStatusWriter: Send + Sync {
    async fn write_conditions(&self, conditions: &[OperatorCondition]) -> Result<()>;
}

/// Writes the observed-config section of the operator's custom resource.
#[async_trait]
pub trait ObservedConfigWriter: Send + Sync {
    /// `patch` is a JSON merge patch against the current `spec.observedConfig`.
    async fn patch_observed_config(&self, patch: &Value) -> Result<()>;
}

pub struct KubeOperatorClient {
    api: Api<ClusterCSIDriver>,
    name: String,
}

impl KubeOperatorClient {
    pub fn new(client: Client, name: impl Into<String>) -> Self {
        Self {
            api: Api::all(client),
            name: name.into(),
        }
    }
}

/// Merges `updates` into `existing` by condition type.
///
/// Conditions owned by other writers are kept. An update whose status did not
/// change keeps the existing transition time.
pub fn set_conditions(existing: &[OperatorCondition], updates: &[OperatorCondition]) -> Vec<OperatorCondition> {
    let mut merged = existing.to_vec();
    for update in updates {
        match merged.iter_mut().find(|c| c.type_ == update.type_) {
            Some(current) => {
                let transition = if current.status == update.status {
                    current.last_transition_time.clone().or_else(|| update.last_transition_time.clone())
                } else {
                    update.last_transition_time.clone()
                };
                *current = OperatorCondition {
                    last_transition_time: transition,
                    ..update.clone()
                };
            }
            None => merged.push(update.clone()),
        }
    }
    merged
}

#[async_trait]
impl OperatorStatusWriter for KubeOperatorClient {
    async fn write_conditions(&self, conditions: &[OperatorCondition]) -> Result<()> {
        let current = self
            .api
            .get_status(&self.name)
            .await
            .with_context(|| format!("reading status of ClusterCSIDriver {}", self.name))?;

        let existing = current.status.as_ref().map(|s| s.conditions.as_slice()).unwrap_or(&[]);
        let merged = set_conditions(existing, conditions);
        if merged == existing {
            debug!("Operator conditions unchanged");
            return Ok(());
        }

        // resourceVersion makes the write fail on a concurrent update instead
        // of dropping the other writer's conditions.
        let patch = json!({
            "metadata": { "resourceVersion": current.resource_version() },
            "status": { "conditions": merged },
        });
        self.api
            .patch_status(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("updating status of ClusterCSIDriver {}", self.name))?;

        debug!("Published {} operator condition(s)", conditions.len());
        Ok(())
    }
}

#[async_trait]
impl ObservedConfigWriter for KubeOperatorClient {
    async fn patch_observed_config(&self, patch: &Value) -> Result<()> {
        let patch = json!({ "spec": { "observedConfig": patch } });

        self.api
            .patch(&self.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .with_context(|| format!("updating observed config of ClusterCSIDriver {}", self.name))?;

        debug!("Observed config updated");
        Ok(())
    }
}
