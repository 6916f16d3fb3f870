//! One-way copy of a config map between namespaces.

use serde::Serialize;

use crate::core::client::kube_resources::{ConfigMap, ObjectMeta};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceLocation {
    pub namespace: String,
    pub name: String,
}

impl ResourceLocation {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorAction {
    Apply(ConfigMap),
    Delete(ResourceLocation),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigMirrorEntry {
    pub source: ResourceLocation,
    pub destination: ResourceLocation,
}

impl ConfigMirrorEntry {
    pub fn new(source: ResourceLocation, destination: ResourceLocation) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// What the destination should look like given the current source.
    ///
    /// No source means no destination. Server-managed metadata is not copied.
    pub fn desired(&self, source: Option<&ConfigMap>) -> MirrorAction {
        let Some(source) = source else {
            return MirrorAction::Delete(self.destination.clone());
        };

        MirrorAction::Apply(ConfigMap {
            metadata: ObjectMeta {
                name: Some(self.destination.name.clone()),
                namespace: Some(self.destination.namespace.clone()),
                labels: source.metadata.labels.clone(),
                annotations: source.metadata.annotations.clone(),
                ..Default::default()
            },
            data: source.data.clone(),
            binary_data: source.binary_data.clone(),
            immutable: source.immutable,
        })
    }
}
