//! Install/remove decisions for optional resources.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::core::client::capability::CapabilityProbe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Install,
    Remove,
    NoOp,
}

#[async_trait]
pub trait GatePredicate: Send + Sync {
    async fn holds(&self) -> bool;
}

/// Constant false. The default delete predicate.
pub struct Never;

#[async_trait]
impl GatePredicate for Never {
    async fn holds(&self) -> bool {
        false
    }
}

/// Holds when the named CRD is served. A failed probe counts as absent.
pub struct CrdExists {
    probe: Arc<dyn CapabilityProbe>,
    crd: String,
}

impl CrdExists {
    pub fn new(probe: Arc<dyn CapabilityProbe>, crd: impl Into<String>) -> Self {
        Self {
            probe,
            crd: crd.into(),
        }
    }
}

#[async_trait]
impl GatePredicate for CrdExists {
    async fn holds(&self) -> bool {
        match self.probe.resource_type_exists(&self.crd).await {
            Ok(exists) => exists,
            Err(err) => {
                debug!(crd = %self.crd, error = %err, "capability probe failed, treating as absent");
                false
            }
        }
    }
}

pub struct ResourceGate {
    name: String,
    install: Box<dyn GatePredicate>,
    delete: Box<dyn GatePredicate>,
}

impl ResourceGate {
    pub fn new(name: impl Into<String>, install: impl GatePredicate + 'static) -> Self {
        Self {
            name: name.into(),
            install: Box::new(install),
            delete: Box::new(Never),
        }
    }

    /// Opt in to removing the resource when `delete` holds.
    pub fn with_destructive_delete(mut self, delete: impl GatePredicate + 'static) -> Self {
        self.delete = Box::new(delete);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Remove wins over Install when both hold.
    pub async fn evaluate(&self) -> GateDecision {
        if self.delete.holds().await {
            GateDecision::Remove
        } else if self.install.holds().await {
            GateDecision::Install
        } else {
            GateDecision::NoOp
        }
    }
}
