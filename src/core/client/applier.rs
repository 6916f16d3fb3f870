use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::api::{DeleteParams, DynamicObject, Patch, PatchParams};
use kube::discovery::{pinned_kind, ApiCapabilities, ApiResource, Scope};
use kube::core::GroupVersionKind;
use kube::{Api, Client, ResourceExt};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::core::client::kube_resources::{ConfigMap, DaemonSet, Deployment};
use crate::errors::AppError;

pub const FIELD_MANAGER: &str = "ebs-csi-operator";

/// Desired-state writes against one cluster.
///
/// Everything the controllers push goes through here, so tests can swap the
/// cluster for a recorder.
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    /// Server-side apply of an arbitrary manifest. A kind the API server does
    /// not serve fails with [`AppError::NotFound`].
    async fn apply_manifest(&self, manifest: &Value) -> Result<()>;

    /// Delete the object a manifest describes. Absent objects are fine.
    async fn delete_manifest(&self, manifest: &Value) -> Result<()>;

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()>;

    async fn apply_daemon_set(&self, daemon_set: &DaemonSet) -> Result<()>;

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<()>;

    /// Returns whether an object was actually removed.
    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool>;
}

pub struct KubeApplier {
    client: Client,
    resources: RwLock<HashMap<GroupVersionKind, (ApiResource, ApiCapabilities)>>,
}

impl KubeApplier {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            resources: RwLock::new(HashMap::new()),
        }
    }

    fn params() -> PatchParams {
        PatchParams::apply(FIELD_MANAGER).force()
    }

    async fn resolve(&self, gvk: &GroupVersionKind) -> Result<(ApiResource, ApiCapabilities)> {
        if let Some(found) = self.resources.read().await.get(gvk) {
            return Ok(found.clone());
        }

        let resolved = pinned_kind(&self.client, gvk).await.map_err(|e| {
            AppError::NotFound(format!(
                "{}/{} {} is not served: {e}",
                gvk.group, gvk.version, gvk.kind
            ))
        })?;

        self.resources
            .write()
            .await
            .insert(gvk.clone(), resolved.clone());
        Ok(resolved)
    }

    async fn dynamic_api(&self, object: &DynamicObject) -> Result<Api<DynamicObject>> {
        let gvk = manifest_gvk(object)?;
        let (resource, caps) = self.resolve(&gvk).await?;

        let api = match (caps.scope, object.namespace()) {
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(self.client.clone(), &ns, &resource)
            }
            (Scope::Namespaced, None) => Api::default_namespaced_with(self.client.clone(), &resource),
            (Scope::Cluster, _) => Api::all_with(self.client.clone(), &resource),
        };
        Ok(api)
    }
}

/// Group/version/kind of a manifest, from its `apiVersion` and `kind`.
pub fn manifest_gvk(object: &DynamicObject) -> Result<GroupVersionKind> {
    let types = object
        .types
        .as_ref()
        .ok_or_else(|| AppError::ConfigurationError("manifest has no apiVersion/kind".into()))?;

    let (group, version) = match types.api_version.split_once('/') {
        Some((group, version)) => (group, version),
        None => ("", types.api_version.as_str()),
    };

    Ok(GroupVersionKind::gvk(group, version, &types.kind))
}

fn parse_manifest(manifest: &Value) -> Result<DynamicObject> {
    let object: DynamicObject =
        serde_json::from_value(manifest.clone()).context("manifest is not a Kubernetes object")?;
    if object.metadata.name.is_none() {
        return Err(AppError::ConfigurationError("manifest has no metadata.name".into()).into());
    }
    Ok(object)
}

#[async_trait]
impl ResourceApplier for KubeApplier {
    async fn apply_manifest(&self, manifest: &Value) -> Result<()> {
        let object = parse_manifest(manifest)?;
        let api = self.dynamic_api(&object).await?;
        let name = object.name_any();

        api.patch(&name, &Self::params(), &Patch::Apply(&object))
            .await
            .with_context(|| format!("applying {name}"))?;

        debug!(name = %name, "Applied manifest");
        Ok(())
    }

    async fn delete_manifest(&self, manifest: &Value) -> Result<()> {
        let object = parse_manifest(manifest)?;
        let api = self.dynamic_api(&object).await?;
        let name = object.name_any();

        if api.get_opt(&name).await?.is_some() {
            api.delete(&name, &DeleteParams::default())
                .await
                .with_context(|| format!("deleting {name}"))?;
            debug!(name = %name, "Deleted manifest object");
        }
        Ok(())
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()> {
        let namespace = deployment.namespace().unwrap_or_default();
        let name = deployment.name_any();
        let api: Api<Deployment> = Api::namespaced(self.client.clone(), &namespace);

        let mut desired = deployment.clone();
        desired.metadata.managed_fields = None;
        desired.metadata.resource_version = None;

        api.patch(&name, &Self::params(), &Patch::Apply(&desired))
            .await
            .with_context(|| format!("applying Deployment {namespace}/{name}"))?;

        debug!("Applied deployment: {}/{}", namespace, name);
        Ok(())
    }

    async fn apply_daemon_set(&self, daemon_set: &DaemonSet) -> Result<()> {
        let namespace = daemon_set.namespace().unwrap_or_default();
        let name = daemon_set.name_any();
        let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), &namespace);

        let mut desired = daemon_set.clone();
        desired.metadata.managed_fields = None;
        desired.metadata.resource_version = None;

        api.patch(&name, &Self::params(), &Patch::Apply(&desired))
            .await
            .with_context(|| format!("applying DaemonSet {namespace}/{name}"))?;

        debug!("Applied daemonset: {}/{}", namespace, name);
        Ok(())
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        let namespace = config_map.namespace().unwrap_or_default();
        let name = config_map.name_any();
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), &namespace);

        api.patch(&name, &Self::params(), &Patch::Apply(config_map))
            .await
            .with_context(|| format!("applying ConfigMap {namespace}/{name}"))?;

        debug!("Applied configmap: {}/{}", namespace, name);
        Ok(())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);

        if api.get_opt(name).await?.is_none() {
            return Ok(false);
        }

        api.delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("deleting ConfigMap {namespace}/{name}"))?;

        debug!("Deleted configmap: {}/{}", namespace, name);
        Ok(true)
    }
}
