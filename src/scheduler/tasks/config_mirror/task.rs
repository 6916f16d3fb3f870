use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::core::client::applier::ResourceApplier;
use crate::core::client::listers::ConfigMapReader;
use crate::domain::mirror::{ConfigMirrorEntry, MirrorAction};
use crate::scheduler::controller_loop::Reconciler;

/// Keeps a destination config map in step with its source.
pub struct ConfigMirrorController {
    name: String,
    entry: ConfigMirrorEntry,
    source: Arc<dyn ConfigMapReader>,
    applier: Arc<dyn ResourceApplier>,
}

impl ConfigMirrorController {
    pub fn new(
        name: impl Into<String>,
        entry: ConfigMirrorEntry,
        source: Arc<dyn ConfigMapReader>,
        applier: Arc<dyn ResourceApplier>,
    ) -> Self {
        Self {
            name: name.into(),
            entry,
            source,
            applier,
        }
    }
}

#[async_trait]
impl Reconciler for ConfigMirrorController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        let src = &self.entry.source;
        let current = self.source.config_map(&src.namespace, &src.name);

        match self.entry.desired(current.as_ref()) {
            MirrorAction::Apply(config_map) => {
                self.applier
                    .apply_config_map(&config_map)
                    .await
                    .with_context(|| format!("failed to mirror {}/{}", src.namespace, src.name))?;
                debug!(controller = %self.name, "destination in sync");
            }
            MirrorAction::Delete(dest) => {
                let deleted = self
                    .applier
                    .delete_config_map(&dest.namespace, &dest.name)
                    .await
                    .with_context(|| format!("failed to delete {}/{}", dest.namespace, dest.name))?;
                if deleted {
                    info!(controller = %self.name, namespace = %dest.namespace, name = %dest.name, "source gone, removed mirrored config map");
                }
            }
        }
        Ok(())
    }
}
