use anyhow::Result;
use async_trait::async_trait;
use kube::{Api, Client};
use tracing::debug;

use crate::core::client::kube_resources::CustomResourceDefinition;

/// Existence check for an extension resource type.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    async fn resource_type_exists(&self, crd_name: &str) -> Result<bool>;
}

pub struct KubeCapabilityProbe {
    client: Client,
}

impl KubeCapabilityProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CapabilityProbe for KubeCapabilityProbe {
    async fn resource_type_exists(&self, crd_name: &str) -> Result<bool> {
        let crds: Api<CustomResourceDefinition> = Api::all(self.client.clone());
        let found = crds.get_opt(crd_name).await?.is_some();

        debug!("CRD {} present: {}", crd_name, found);
        Ok(found)
    }
}
