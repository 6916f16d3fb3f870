//! Default-class handling for storage classes the operator ships.

use serde_json::Value;

use crate::core::client::kube_resources::StorageClass;

pub const DEFAULT_CLASS_ANNOTATION: &str = "storageclass.kubernetes.io/is-default-class";

/// Settles the default-class annotation of `manifest` against the live classes.
///
/// A value already on the live object wins, so an admin's choice is kept.
/// A new class only claims the default when no other class holds it.
pub fn with_default_annotation(mut manifest: Value, existing: &[StorageClass]) -> Value {
    let name = manifest["metadata"]["name"].as_str().unwrap_or_default().to_string();

    let current = existing
        .iter()
        .find(|sc| sc.metadata.name.as_deref() == Some(name.as_str()))
        .and_then(default_annotation);

    let value = match current {
        Some(value) => value.to_string(),
        None if existing.iter().any(|sc| sc.metadata.name.as_deref() != Some(name.as_str()) && is_default(sc)) => {
            "false".to_string()
        }
        None => return manifest,
    };

    let Some(metadata) = manifest.get_mut("metadata").and_then(Value::as_object_mut) else {
        return manifest;
    };
    let annotations = metadata
        .entry("annotations")
        .or_insert_with(|| Value::Object(Default::default()));
    if let Some(annotations) = annotations.as_object_mut() {
        annotations.insert(DEFAULT_CLASS_ANNOTATION.to_string(), Value::String(value));
    }
    manifest
}

fn default_annotation(sc: &StorageClass) -> Option<&str> {
    sc.metadata
        .annotations
        .as_ref()?
        .get(DEFAULT_CLASS_ANNOTATION)
        .map(String::as_str)
}

fn is_default(sc: &StorageClass) -> bool {
    default_annotation(sc) == Some("true")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gp3_manifest() -> Value {
        json!({
            "apiVersion": "storage.k8s.io/v1",
            "kind": "StorageClass",
            "metadata": {
                "name": "gp3-csi",
                "annotations": { DEFAULT_CLASS_ANNOTATION: "true" }
            },
            "provisioner": "ebs.csi.aws.com"
        })
    }

    fn class(name: &str, default: Option<&str>) -> StorageClass {
        let mut sc = StorageClass::default();
        sc.metadata.name = Some(name.into());
        if let Some(value) = default {
            sc.metadata.annotations = Some([(DEFAULT_CLASS_ANNOTATION.to_string(), value.to_string())].into());
        }
        sc
    }

    fn annotation(manifest: &Value) -> Option<&str> {
        manifest["metadata"]["annotations"][DEFAULT_CLASS_ANNOTATION].as_str()
    }

    #[test]
    fn claims_default_on_an_empty_cluster() {
        let out = with_default_annotation(gp3_manifest(), &[class("gp2-csi", None)]);
        assert_eq!(annotation(&out), Some("true"));
    }

    #[test]
    fn yields_when_another_class_is_default() {
        let out = with_default_annotation(gp3_manifest(), &[class("local-ssd", Some("true"))]);
        assert_eq!(annotation(&out), Some("false"));
    }

    #[test]
    fn keeps_the_value_set_on_the_live_class() {
        let existing = [class("gp3-csi", Some("false"))];
        let out = with_default_annotation(gp3_manifest(), &existing);
        assert_eq!(annotation(&out), Some("false"));

        let existing = [class("gp3-csi", Some("true")), class("local-ssd", Some("true"))];
        let out = with_default_annotation(gp3_manifest(), &existing);
        assert_eq!(annotation(&out), Some("true"));
    }

    #[test]
    fn adds_annotations_when_the_manifest_has_none() {
        let manifest = json!({ "kind": "StorageClass", "metadata": { "name": "gp3-csi" } });
        let out = with_default_annotation(manifest, &[class("other", Some("true"))]);
        assert_eq!(annotation(&out), Some("false"));
    }
}
