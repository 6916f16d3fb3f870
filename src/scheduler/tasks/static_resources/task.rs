use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::core::client::applier::ResourceApplier;
use crate::core::client::listers::OperatorSource;
use crate::core::client::manifests::ManifestSource;
use crate::errors::{wiring_error, AppError};
use crate::scheduler::controller_loop::Reconciler;
use crate::scheduler::tasks::managed_spec;

#[derive(Debug, Clone)]
pub struct StaticResource {
    pub file: String,
    pub manifest: Value,
    /// Skip the object when its kind is not served, e.g. ServiceMonitor
    /// without the monitoring stack.
    pub ignore_not_found_on_create: bool,
}

impl StaticResource {
    pub fn load(manifests: &dyn ManifestSource, file: &str) -> Result<Self, AppError> {
        let manifest = manifests
            .read(file)
            .map_err(|e| wiring_error(file, format!("{e:#}")))?;
        Ok(Self {
            file: file.to_string(),
            manifest,
            ignore_not_found_on_create: false,
        })
    }

    pub fn load_all(manifests: &dyn ManifestSource, files: &[&str]) -> Result<Vec<Self>, AppError> {
        files.iter().map(|f| Self::load(manifests, f)).collect()
    }

    pub fn ignoring_not_found(mut self) -> Self {
        self.ignore_not_found_on_create = true;
        self
    }
}

/// Applies a fixed list of manifests every tick.
///
/// Every manifest is attempted; failures are reported together.
pub struct StaticResourcesController {
    name: String,
    resources: Vec<StaticResource>,
    operator: Arc<dyn OperatorSource>,
    applier: Arc<dyn ResourceApplier>,
}

impl StaticResourcesController {
    pub fn new(
        name: impl Into<String>,
        resources: Vec<StaticResource>,
        operator: Arc<dyn OperatorSource>,
        applier: Arc<dyn ResourceApplier>,
    ) -> Self {
        Self {
            name: name.into(),
            resources,
            operator,
            applier,
        }
    }
}

#[async_trait]
impl Reconciler for StaticResourcesController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        if managed_spec(&self.name, self.operator.as_ref()).is_none() {
            return Ok(());
        }

        let mut errors = Vec::new();
        for resource in &self.resources {
            match self.applier.apply_manifest(&resource.manifest).await {
                Ok(()) => {}
                Err(err) if resource.ignore_not_found_on_create && is_not_found(&err) => {
                    debug!(controller = %self.name, file = %resource.file, "kind not served, skipping");
                }
                Err(err) => errors.push(format!("{}: {err:#}", resource.file)),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{}", errors.join("; ")))
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AppError>(), Some(AppError::NotFound(_)))
}
