use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::client::applier::ResourceApplier;
use crate::core::client::listers::OperatorSource;
use crate::domain::gate::{GateDecision, ResourceGate};
use crate::scheduler::controller_loop::Reconciler;
use crate::scheduler::tasks::managed_spec;
use crate::scheduler::tasks::static_resources::task::StaticResource;

/// Manifests whose presence follows a gate decision.
pub struct ConditionalResourcesController {
    name: String,
    gate: ResourceGate,
    resources: Vec<StaticResource>,
    operator: Arc<dyn OperatorSource>,
    applier: Arc<dyn ResourceApplier>,
}

impl ConditionalResourcesController {
    pub fn new(
        name: impl Into<String>,
        gate: ResourceGate,
        resources: Vec<StaticResource>,
        operator: Arc<dyn OperatorSource>,
        applier: Arc<dyn ResourceApplier>,
    ) -> Self {
        Self {
            name: name.into(),
            gate,
            resources,
            operator,
            applier,
        }
    }
}

#[async_trait]
impl Reconciler for ConditionalResourcesController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        if managed_spec(&self.name, self.operator.as_ref()).is_none() {
            return Ok(());
        }

        let decision = self.gate.evaluate().await;
        debug!(controller = %self.name, gate = %self.gate.name(), ?decision, "gate evaluated");

        let mut errors = Vec::new();
        match decision {
            GateDecision::NoOp => {}
            GateDecision::Install => {
                for resource in &self.resources {
                    if let Err(err) = self.applier.apply_manifest(&resource.manifest).await {
                        errors.push(format!("{}: {err:#}", resource.file));
                    }
                }
            }
            GateDecision::Remove => {
                for resource in &self.resources {
                    match self.applier.delete_manifest(&resource.manifest).await {
                        Ok(()) => info!(controller = %self.name, file = %resource.file, "removed gated resource"),
                        Err(err) => errors.push(format!("{}: {err:#}", resource.file)),
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{}", errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::domain::gate::{CrdExists, GatePredicate};
    use crate::test_support::{operator, FakeApplier, FakeProbe, FixedOperator};

    const CRD: &str = "volumesnapshotclasses.snapshot.storage.k8s.io";

    struct Always;

    #[async_trait]
    impl GatePredicate for Always {
        async fn holds(&self) -> bool {
            true
        }
    }

    fn snapshot_class() -> Vec<StaticResource> {
        vec![StaticResource {
            file: "volumesnapshotclass.yaml".into(),
            manifest: json!({
                "apiVersion": "snapshot.storage.k8s.io/v1",
                "kind": "VolumeSnapshotClass",
                "metadata": { "name": "csi-aws-vsc" }
            }),
            ignore_not_found_on_create: false,
        }]
    }

    fn controller(gate: ResourceGate, applier: Arc<FakeApplier>) -> ConditionalResourcesController {
        ConditionalResourcesController::new(
            "VolumeSnapshotClass",
            gate,
            snapshot_class(),
            Arc::new(FixedOperator(Some(operator("Managed")))),
            applier,
        )
    }

    #[tokio::test]
    async fn installs_when_the_crd_exists() {
        let applier = Arc::new(FakeApplier::default());
        let gate = ResourceGate::new("snapshot-class", CrdExists::new(Arc::new(FakeProbe::present(CRD)), CRD));
        controller(gate, applier.clone()).sync().await.unwrap();
        assert_eq!(applier.applied_names(), vec!["csi-aws-vsc"]);
    }

    #[tokio::test]
    async fn absent_or_failing_probe_leaves_things_alone() {
        for probe in [FakeProbe::absent(), FakeProbe::failing()] {
            let applier = Arc::new(FakeApplier::default());
            let gate = ResourceGate::new("snapshot-class", CrdExists::new(Arc::new(probe), CRD));
            controller(gate, applier.clone()).sync().await.unwrap();
            assert!(applier.applied_names().is_empty());
            assert!(applier.deleted_names().is_empty());
        }
    }

    #[tokio::test]
    async fn remove_deletes_gated_manifests() {
        let applier = Arc::new(FakeApplier::default());
        let gate = ResourceGate::new("snapshot-class", Always).with_destructive_delete(Always);
        controller(gate, applier.clone()).sync().await.unwrap();
        assert!(applier.applied_names().is_empty());
        assert_eq!(applier.deleted_names(), vec!["csi-aws-vsc"]);
    }
}
