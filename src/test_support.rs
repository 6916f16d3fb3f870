//! Builders and in-memory fakes shared by the unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::core::client::applier::ResourceApplier;
use crate::core::client::capability::CapabilityProbe;
use crate::core::client::kube_resources::{
    ClusterCSIDriver, ClusterCSIDriverSpec, ConfigMap, Container, DaemonSet, Deployment,
    OperatorCondition, PodSpec, Proxy, StorageClass, Volume,
};
use crate::core::client::listers::{ConfigMapReader, OperatorSource, ProxySource, StorageClassReader};
use crate::core::client::openshift::CLUSTER_CSI_DRIVER_NAME;
use crate::core::client::operator_client::{ObservedConfigWriter, OperatorStatusWriter};
use crate::core::state::cluster::cluster_state::ClusterState;
use crate::core::state::cluster::cluster_state_source::ClusterStateSource;
use crate::errors::AppError;
use crate::logging::LogFilterSink;

pub fn container(name: &str) -> Container {
    Container {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn volume(name: &str) -> Volume {
    Volume {
        name: name.to_string(),
        ..Default::default()
    }
}

pub fn deployment_with(containers: Vec<Container>, volumes: Vec<Volume>) -> Deployment {
    let mut deployment = Deployment::default();
    deployment.metadata.name = Some("aws-ebs-csi-driver-controller".into());
    let spec = deployment.spec.get_or_insert_with(Default::default);
    spec.template.spec = Some(PodSpec {
        containers,
        volumes: if volumes.is_empty() { None } else { Some(volumes) },
        ..Default::default()
    });
    deployment
}

pub fn operator(management_state: &str) -> ClusterCSIDriver {
    ClusterCSIDriver::new(
        CLUSTER_CSI_DRIVER_NAME,
        ClusterCSIDriverSpec {
            management_state: management_state.into(),
            ..Default::default()
        },
    )
}

pub struct FixedOperator(pub Option<ClusterCSIDriver>);

impl OperatorSource for FixedOperator {
    fn operator(&self) -> Option<ClusterCSIDriver> {
        self.0.clone()
    }
}

pub struct FixedProxy(pub Option<Proxy>);

impl ProxySource for FixedProxy {
    fn proxy(&self) -> Option<Proxy> {
        self.0.clone()
    }
}

pub struct FixedStorageClasses(pub Vec<StorageClass>);

impl StorageClassReader for FixedStorageClasses {
    fn storage_classes(&self) -> Vec<StorageClass> {
        self.0.clone()
    }
}

pub struct FixedClusterState(pub ClusterState);

impl ClusterStateSource for FixedClusterState {
    fn snapshot(&self) -> ClusterState {
        self.0.clone()
    }
}

#[derive(Default)]
pub struct FakeConfigMaps {
    items: Mutex<BTreeMap<(String, String), ConfigMap>>,
}

impl FakeConfigMaps {
    pub fn put(&self, config_map: ConfigMap) {
        let key = (
            config_map.metadata.namespace.clone().unwrap_or_default(),
            config_map.metadata.name.clone().unwrap_or_default(),
        );
        self.items.lock().unwrap().insert(key, config_map);
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.items
            .lock()
            .unwrap()
            .remove(&(namespace.to_string(), name.to_string()));
    }
}

impl ConfigMapReader for FakeConfigMaps {
    fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.items
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

/// Records every write. Kinds can be configured to fail or to look unserved.
#[derive(Default)]
pub struct FakeApplier {
    applied: Mutex<Vec<Value>>,
    deleted: Mutex<Vec<Value>>,
    deployments: Mutex<Vec<Deployment>>,
    daemon_sets: Mutex<Vec<DaemonSet>>,
    config_maps: Mutex<Vec<ConfigMap>>,
    deleted_config_maps: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
    unserved: HashSet<String>,
}

impl FakeApplier {
    pub fn failing_kind(mut self, kind: &str) -> Self {
        self.failing.insert(kind.to_string());
        self
    }

    pub fn unserved_kind(mut self, kind: &str) -> Self {
        self.unserved.insert(kind.to_string());
        self
    }

    pub fn applied(&self) -> Vec<Value> {
        self.applied.lock().unwrap().clone()
    }

    pub fn applied_names(&self) -> Vec<String> {
        names(&self.applied.lock().unwrap())
    }

    pub fn deleted_names(&self) -> Vec<String> {
        names(&self.deleted.lock().unwrap())
    }

    pub fn deployments(&self) -> Vec<Deployment> {
        self.deployments.lock().unwrap().clone()
    }

    pub fn daemon_sets(&self) -> Vec<DaemonSet> {
        self.daemon_sets.lock().unwrap().clone()
    }

    pub fn config_maps(&self) -> Vec<ConfigMap> {
        self.config_maps.lock().unwrap().clone()
    }

    pub fn deleted_config_maps(&self) -> Vec<(String, String)> {
        self.deleted_config_maps.lock().unwrap().clone()
    }

    fn check(&self, manifest: &Value) -> Result<()> {
        let kind = manifest["kind"].as_str().unwrap_or_default();
        if self.unserved.contains(kind) {
            return Err(AppError::NotFound(format!("kind {kind} is not served")).into());
        }
        if self.failing.contains(kind) {
            return Err(anyhow!("apply of {kind} rejected"));
        }
        Ok(())
    }
}

fn names(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| v["metadata"]["name"].as_str().map(String::from))
        .collect()
}

#[async_trait]
impl ResourceApplier for FakeApplier {
    async fn apply_manifest(&self, manifest: &Value) -> Result<()> {
        self.check(manifest)?;
        self.applied.lock().unwrap().push(manifest.clone());
        Ok(())
    }

    async fn delete_manifest(&self, manifest: &Value) -> Result<()> {
        self.deleted.lock().unwrap().push(manifest.clone());
        Ok(())
    }

    async fn apply_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.deployments.lock().unwrap().push(deployment.clone());
        Ok(())
    }

    async fn apply_daemon_set(&self, daemon_set: &DaemonSet) -> Result<()> {
        self.daemon_sets.lock().unwrap().push(daemon_set.clone());
        Ok(())
    }

    async fn apply_config_map(&self, config_map: &ConfigMap) -> Result<()> {
        self.config_maps.lock().unwrap().push(config_map.clone());
        Ok(())
    }

    async fn delete_config_map(&self, namespace: &str, name: &str) -> Result<bool> {
        self.deleted_config_maps
            .lock()
            .unwrap()
            .push((namespace.to_string(), name.to_string()));
        Ok(true)
    }
}

pub enum FakeProbe {
    Present(String),
    Absent,
    Failing,
}

impl FakeProbe {
    pub fn present(crd: &str) -> Self {
        FakeProbe::Present(crd.to_string())
    }

    pub fn absent() -> Self {
        FakeProbe::Absent
    }

    pub fn failing() -> Self {
        FakeProbe::Failing
    }
}

#[async_trait]
impl CapabilityProbe for FakeProbe {
    async fn resource_type_exists(&self, crd_name: &str) -> Result<bool> {
        match self {
            FakeProbe::Present(crd) => Ok(crd == crd_name),
            FakeProbe::Absent => Ok(false),
            FakeProbe::Failing => Err(anyhow!("discovery unavailable")),
        }
    }
}

#[derive(Default)]
pub struct FakeStatusWriter {
    written: Mutex<Vec<Vec<OperatorCondition>>>,
}

impl FakeStatusWriter {
    pub fn last(&self) -> Option<Vec<OperatorCondition>> {
        self.written.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl OperatorStatusWriter for FakeStatusWriter {
    async fn write_conditions(&self, conditions: &[OperatorCondition]) -> Result<()> {
        self.written.lock().unwrap().push(conditions.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeObservedConfigWriter {
    patches: Mutex<Vec<Value>>,
}

impl FakeObservedConfigWriter {
    pub fn patches(&self) -> Vec<Value> {
        self.patches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservedConfigWriter for FakeObservedConfigWriter {
    async fn patch_observed_config(&self, patch: &Value) -> Result<()> {
        self.patches.lock().unwrap().push(patch.clone());
        Ok(())
    }
}

pub struct FakeLogFilter {
    base: String,
    directives: Mutex<Vec<String>>,
}

impl FakeLogFilter {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.to_string(),
            directives: Mutex::new(Vec::new()),
        }
    }

    pub fn directives(&self) -> Vec<String> {
        self.directives.lock().unwrap().clone()
    }
}

impl LogFilterSink for FakeLogFilter {
    fn base_directive(&self) -> &str {
        &self.base
    }

    fn set_directive(&self, directive: &str) -> Result<(), AppError> {
        self.directives.lock().unwrap().push(directive.to_string());
        Ok(())
    }
}
