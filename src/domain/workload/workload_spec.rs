use std::collections::{BTreeMap, HashMap};

use crate::core::client::kube_resources::{
    Container, DaemonSet, Deployment, ObjectMeta, PodSpec, Volume,
};
use crate::errors::{missing_container, AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
}

/// The object a spec was lifted from, with its pod template emptied out.
#[derive(Debug, Clone, PartialEq)]
enum Shell {
    Deployment(Deployment),
    DaemonSet(DaemonSet),
}

/// Owned, editable view of a workload template.
///
/// The pod spec, pod-template annotations and replica count are lifted out of
/// the object so hooks edit them directly; `into_deployment` / `into_daemon_set`
/// put them back. Containers are indexed by name; when a template repeats a
/// name, the first container with that name is the one hooks see.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadSpec {
    shell: Shell,
    pod: PodSpec,
    pod_annotations: BTreeMap<String, String>,
    replicas: Option<i32>,
    containers_by_name: HashMap<String, usize>,
}

impl WorkloadSpec {
    pub fn from_deployment(mut deployment: Deployment) -> Self {
        let spec = deployment.spec.get_or_insert_with(Default::default);
        let replicas = spec.replicas.take();
        let pod = spec.template.spec.take().unwrap_or_default();
        let pod_annotations = spec
            .template
            .metadata
            .as_mut()
            .and_then(|m| m.annotations.take())
            .unwrap_or_default();

        Self::assemble(Shell::Deployment(deployment), pod, pod_annotations, replicas)
    }

    pub fn from_daemon_set(mut daemon_set: DaemonSet) -> Self {
        let spec = daemon_set.spec.get_or_insert_with(Default::default);
        let pod = spec.template.spec.take().unwrap_or_default();
        let pod_annotations = spec
            .template
            .metadata
            .as_mut()
            .and_then(|m| m.annotations.take())
            .unwrap_or_default();

        Self::assemble(Shell::DaemonSet(daemon_set), pod, pod_annotations, None)
    }

    fn assemble(
        shell: Shell,
        pod: PodSpec,
        pod_annotations: BTreeMap<String, String>,
        replicas: Option<i32>,
    ) -> Self {
        let mut spec = Self {
            shell,
            pod,
            pod_annotations,
            replicas,
            containers_by_name: HashMap::new(),
        };
        spec.reindex();
        spec
    }

    pub fn kind(&self) -> WorkloadKind {
        match self.shell {
            Shell::Deployment(_) => WorkloadKind::Deployment,
            Shell::DaemonSet(_) => WorkloadKind::DaemonSet,
        }
    }

    pub fn into_deployment(self) -> Result<Deployment, AppError> {
        let Self {
            shell,
            pod,
            pod_annotations,
            replicas,
            ..
        } = self;

        let Shell::Deployment(mut deployment) = shell else {
            return Err(AppError::ConfigurationError(
                "workload spec is a DaemonSet, not a Deployment".into(),
            ));
        };

        let spec = deployment.spec.get_or_insert_with(Default::default);
        spec.replicas = replicas;
        spec.template.spec = Some(pod);
        restore_annotations(&mut spec.template.metadata, pod_annotations);
        Ok(deployment)
    }

    /// Replica count does not exist on a DaemonSet and is dropped here.
    pub fn into_daemon_set(self) -> Result<DaemonSet, AppError> {
        let Self {
            shell,
            pod,
            pod_annotations,
            ..
        } = self;

        let Shell::DaemonSet(mut daemon_set) = shell else {
            return Err(AppError::ConfigurationError(
                "workload spec is a Deployment, not a DaemonSet".into(),
            ));
        };

        let spec = daemon_set.spec.get_or_insert_with(Default::default);
        spec.template.spec = Some(pod);
        restore_annotations(&mut spec.template.metadata, pod_annotations);
        Ok(daemon_set)
    }

    /// Canonical JSON form, used to compare rendered specs byte for byte.
    pub fn to_json(&self) -> Result<Vec<u8>, AppError> {
        let bytes = match self.kind() {
            WorkloadKind::Deployment => serde_json::to_vec(&self.clone().into_deployment()?),
            WorkloadKind::DaemonSet => serde_json::to_vec(&self.clone().into_daemon_set()?),
        };
        bytes.map_err(crate::errors::internal_error)
    }

    fn metadata(&self) -> &ObjectMeta {
        match &self.shell {
            Shell::Deployment(d) => &d.metadata,
            Shell::DaemonSet(d) => &d.metadata,
        }
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match &mut self.shell {
            Shell::Deployment(d) => &mut d.metadata,
            Shell::DaemonSet(d) => &mut d.metadata,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata().name.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata().namespace.as_deref()
    }

    pub fn set_namespace(&mut self, namespace: impl Into<String>) {
        self.metadata_mut().namespace = Some(namespace.into());
    }

    pub fn replicas(&self) -> Option<i32> {
        self.replicas
    }

    pub fn set_replicas(&mut self, replicas: i32) {
        self.replicas = Some(replicas);
    }

    pub fn priority_class(&self) -> Option<&str> {
        self.pod.priority_class_name.as_deref()
    }

    pub fn set_priority_class(&mut self, class: impl Into<String>) {
        self.pod.priority_class_name = Some(class.into());
    }

    pub fn node_selector(&self) -> BTreeMap<String, String> {
        self.pod.node_selector.clone().unwrap_or_default()
    }

    pub fn pod_annotation(&self, key: &str) -> Option<&str> {
        self.pod_annotations.get(key).map(String::as_str)
    }

    pub fn set_pod_annotation(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pod_annotations.insert(key.into(), value.into());
    }

    // ---- containers ----

    pub fn containers(&self) -> &[Container] {
        &self.pod.containers
    }

    pub fn container_names(&self) -> Vec<&str> {
        self.pod.containers.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn container(&self, name: &str) -> Option<&Container> {
        let index = *self.containers_by_name.get(name)?;
        self.pod.containers.get(index)
    }

    pub fn container_mut(&mut self, name: &str) -> Option<&mut Container> {
        let index = *self.containers_by_name.get(name)?;
        self.pod.containers.get_mut(index)
    }

    /// The container a hook has decided it must edit.
    pub fn require_container(&mut self, hook: &str, name: &str) -> Result<&mut Container, AppError> {
        self.container_mut(name)
            .ok_or_else(|| missing_container(hook, name))
    }

    /// Edit every container. Renames are picked up by the index.
    pub fn update_containers(&mut self, mut f: impl FnMut(&mut Container)) {
        self.pod.containers.iter_mut().for_each(&mut f);
        self.reindex();
    }

    pub fn retain_containers(&mut self, f: impl FnMut(&Container) -> bool) {
        self.pod.containers.retain(f);
        self.reindex();
    }

    /// Replace the container with the same name, or append it.
    pub fn upsert_container(&mut self, container: Container) {
        match self.containers_by_name.get(&container.name) {
            Some(&index) => self.pod.containers[index] = container,
            None => {
                self.containers_by_name
                    .insert(container.name.clone(), self.pod.containers.len());
                self.pod.containers.push(container);
            }
        }
    }

    fn reindex(&mut self) {
        self.containers_by_name.clear();
        for (index, container) in self.pod.containers.iter().enumerate() {
            self.containers_by_name
                .entry(container.name.clone())
                .or_insert(index);
        }
    }

    // ---- volumes ----

    pub fn volumes(&self) -> &[Volume] {
        self.pod.volumes.as_deref().unwrap_or(&[])
    }

    pub fn volume(&self, name: &str) -> Option<&Volume> {
        self.volumes().iter().find(|v| v.name == name)
    }

    /// Applies `f` to every volume with this name.
    pub fn update_volumes_named(&mut self, name: &str, mut f: impl FnMut(&mut Volume)) {
        if let Some(volumes) = self.pod.volumes.as_mut() {
            volumes.iter_mut().filter(|v| v.name == name).for_each(|v| f(v));
        }
    }

    /// Replace the first volume with the same name, or append it.
    pub fn upsert_volume(&mut self, volume: Volume) {
        let volumes = self.pod.volumes.get_or_insert_with(Vec::new);
        match volumes.iter_mut().find(|v| v.name == volume.name) {
            Some(existing) => *existing = volume,
            None => volumes.push(volume),
        }
    }

    /// Remove the first volume with this name only.
    pub fn remove_volume(&mut self, name: &str) -> Option<Volume> {
        let volumes = self.pod.volumes.as_mut()?;
        let index = volumes.iter().position(|v| v.name == name)?;
        Some(volumes.remove(index))
    }
}

fn restore_annotations(metadata: &mut Option<ObjectMeta>, annotations: BTreeMap<String, String>) {
    if annotations.is_empty() {
        if let Some(meta) = metadata.as_mut() {
            meta.annotations = None;
        }
        return;
    }
    metadata.get_or_insert_with(Default::default).annotations = Some(annotations);
}
