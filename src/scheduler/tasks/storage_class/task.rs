use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::core::client::applier::ResourceApplier;
use crate::core::client::listers::{OperatorSource, StorageClassReader};
use crate::domain::storage_class::with_default_annotation;
use crate::scheduler::controller_loop::Reconciler;
use crate::scheduler::tasks::managed_spec;
use crate::scheduler::tasks::static_resources::task::StaticResource;

/// Applies a shipped storage class without fighting over the cluster default.
pub struct StorageClassController {
    name: String,
    resource: StaticResource,
    classes: Arc<dyn StorageClassReader>,
    operator: Arc<dyn OperatorSource>,
    applier: Arc<dyn ResourceApplier>,
}

impl StorageClassController {
    pub fn new(
        name: impl Into<String>,
        resource: StaticResource,
        classes: Arc<dyn StorageClassReader>,
        operator: Arc<dyn OperatorSource>,
        applier: Arc<dyn ResourceApplier>,
    ) -> Self {
        Self {
            name: name.into(),
            resource,
            classes,
            operator,
            applier,
        }
    }
}

#[async_trait]
impl Reconciler for StorageClassController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        if managed_spec(&self.name, self.operator.as_ref()).is_none() {
            return Ok(());
        }

        let existing = self.classes.storage_classes();
        let manifest = with_default_annotation(self.resource.manifest.clone(), &existing);
        self.applier
            .apply_manifest(&manifest)
            .await
            .with_context(|| format!("failed to apply {}", self.resource.file))?;

        debug!(controller = %self.name, file = %self.resource.file, "storage class applied");
        Ok(())
    }
}
