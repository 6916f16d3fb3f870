use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

/// Source of the static manifests the controllers apply.
pub trait ManifestSource: Send + Sync {
    fn read(&self, name: &str) -> Result<Value>;
}

/// Reads YAML manifests from a directory, optionally filling in `${NAMESPACE}`.
#[derive(Debug, Clone)]
pub struct FsManifestSource {
    root: PathBuf,
    namespace: Option<String>,
}

impl FsManifestSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            root: self.root.clone(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ManifestSource for FsManifestSource {
    fn read(&self, name: &str) -> Result<Value> {
        let path = self.root.join(name);
        let mut content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading manifest {}", path.display()))?;

        if let Some(ns) = &self.namespace {
            content = content.replace("${NAMESPACE}", ns);
        }

        serde_yaml::from_str(&content).with_context(|| format!("parsing manifest {name}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_namespace_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("controller_sa.yaml"),
            "apiVersion: v1\nkind: ServiceAccount\nmetadata:\n  name: controller-sa\n  namespace: ${NAMESPACE}\n",
        )
        .unwrap();

        let plain = FsManifestSource::new(dir.path());
        let raw = plain.read("controller_sa.yaml").unwrap();
        assert_eq!(raw["metadata"]["namespace"], "${NAMESPACE}");

        let scoped = plain.with_namespace("clusters-guest");
        let manifest = scoped.read("controller_sa.yaml").unwrap();
        assert_eq!(manifest["metadata"]["namespace"], "clusters-guest");
        assert_eq!(manifest["kind"], "ServiceAccount");
    }

    #[test]
    fn missing_manifest_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsManifestSource::new(dir.path()).read("node.yaml").unwrap_err();
        assert!(format!("{err:#}").contains("node.yaml"));
    }
}
