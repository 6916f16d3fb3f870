use std::collections::BTreeMap;

use serde::Serialize;

use crate::core::client::kube_resources::{AwsResourceTag, ConfigMap, Infrastructure, Secret};
use crate::core::util::hash_util::{hash_binary_data, hash_string_data};

/// Data key that marks a cloud config object as carrying a custom CA bundle.
pub const CUSTOM_CA_BUNDLE_KEY: &str = "ca-bundle.pem";

/// Data key the cluster network operator injects into trusted CA config maps.
pub const TRUSTED_CA_BUNDLE_KEY: &str = "ca-bundle.crt";

/// Read-only snapshot of the external state the hooks consult.
///
/// Built from cache reads at the start of a tick and never mutated by the
/// pipeline. Every field is optional data: `None` (or empty) means the hooks
/// that depend on it do nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterState {
    pub platform: Option<String>,
    pub region: Option<String>,
    pub resource_tags: Vec<AwsResourceTag>,
    pub ec2_endpoint: Option<String>,
    /// Name of the config map holding a custom CA bundle, if one is in use.
    pub custom_ca_bundle: Option<String>,
    pub trusted_ca_bundle_hash: Option<String>,
    /// One label set per node of the workload cluster.
    pub node_labels: Vec<BTreeMap<String, String>>,
    pub credentials_hash: Option<String>,
}

impl ClusterState {
    /// Fill platform metadata from the Infrastructure singleton.
    pub fn apply_infrastructure(&mut self, infra: &Infrastructure) {
        let Some(platform) = infra.status.as_ref().and_then(|s| s.platform_status.as_ref()) else {
            return;
        };
        self.platform = platform.type_.clone();

        let Some(aws) = platform.aws.as_ref() else {
            return;
        };

        self.region = Some(aws.region.clone()).filter(|r| !r.is_empty());
        self.resource_tags = aws.resource_tags.clone();
        // Last entry wins if the endpoint list names ec2 twice.
        self.ec2_endpoint = aws
            .service_endpoints
            .iter()
            .filter(|e| e.name == "ec2")
            .last()
            .map(|e| e.url.clone())
            .filter(|url| !url.is_empty());
    }

    /// Number of nodes carrying every label of `selector`.
    pub fn count_nodes_matching(&self, selector: &BTreeMap<String, String>) -> usize {
        self.node_labels
            .iter()
            .filter(|labels| selector.iter().all(|(k, v)| labels.get(k) == Some(v)))
            .count()
    }
}

/// Name of the config map when it carries a custom CA bundle.
pub fn custom_ca_bundle_name(config_map: &ConfigMap) -> Option<String> {
    config_map
        .data
        .as_ref()
        .filter(|data| data.contains_key(CUSTOM_CA_BUNDLE_KEY))
        .and(config_map.metadata.name.clone())
}

/// Content hash of the trusted CA config map when it carries a bundle.
pub fn trusted_ca_bundle_hash(config_map: &ConfigMap) -> Option<String> {
    config_map
        .data
        .as_ref()
        .filter(|data| data.contains_key(TRUSTED_CA_BUNDLE_KEY))
        .map(hash_string_data)
}

pub fn secret_hash(secret: &Secret) -> String {
    hash_binary_data(&secret.data.clone().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::kube_resources::ObjectMeta;
    use serde_json::json;

    fn infra(status: serde_json::Value) -> Infrastructure {
        serde_json::from_value(json!({
            "apiVersion": "config.openshift.io/v1",
            "kind": "Infrastructure",
            "metadata": { "name": "cluster" },
            "spec": {},
            "status": status
        }))
        .unwrap()
    }

    fn config_map(name: &str, data: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.into()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn reads_aws_platform_metadata() {
        let mut state = ClusterState::default();
        state.apply_infrastructure(&infra(json!({
            "platformStatus": {
                "type": "AWS",
                "aws": {
                    "region": "us-east-1",
                    "resourceTags": [
                        { "key": "owner", "value": "storage" },
                        { "key": "env", "value": "prod" }
                    ],
                    "serviceEndpoints": [
                        { "name": "s3", "url": "https://s3.local" },
                        { "name": "ec2", "url": "https://ec2.local" }
                    ]
                }
            }
        })));

        assert_eq!(state.platform.as_deref(), Some("AWS"));
        assert_eq!(state.region.as_deref(), Some("us-east-1"));
        assert_eq!(state.resource_tags.len(), 2);
        assert_eq!(state.resource_tags[0].key, "owner");
        assert_eq!(state.ec2_endpoint.as_deref(), Some("https://ec2.local"));
    }

    #[test]
    fn non_aws_platform_leaves_metadata_absent() {
        let mut state = ClusterState::default();
        state.apply_infrastructure(&infra(json!({ "platformStatus": { "type": "None" } })));
        assert_eq!(state.platform.as_deref(), Some("None"));
        assert_eq!(state.region, None);
        assert!(state.resource_tags.is_empty());

        let mut state = ClusterState::default();
        state.apply_infrastructure(&infra(json!({})));
        assert_eq!(state, ClusterState::default());
    }

    #[test]
    fn custom_ca_bundle_requires_the_data_key() {
        let with_key = config_map("kube-cloud-config", &[("ca-bundle.pem", "PEM")]);
        assert_eq!(
            custom_ca_bundle_name(&with_key).as_deref(),
            Some("kube-cloud-config")
        );

        let without_key = config_map("kube-cloud-config", &[("config", "[Global]")]);
        assert_eq!(custom_ca_bundle_name(&without_key), None);

        let empty = ConfigMap::default();
        assert_eq!(custom_ca_bundle_name(&empty), None);
    }

    #[test]
    fn trusted_ca_hash_tracks_content() {
        let a = config_map("trusted", &[("ca-bundle.crt", "A")]);
        let b = config_map("trusted", &[("ca-bundle.crt", "B")]);
        assert!(trusted_ca_bundle_hash(&a).is_some());
        assert_ne!(trusted_ca_bundle_hash(&a), trusted_ca_bundle_hash(&b));
        assert_eq!(trusted_ca_bundle_hash(&config_map("trusted", &[])), None);
    }

    #[test]
    fn counts_nodes_by_selector() {
        let master: BTreeMap<String, String> =
            [("node-role.kubernetes.io/master".to_string(), String::new())].into();
        let worker: BTreeMap<String, String> =
            [("node-role.kubernetes.io/worker".to_string(), String::new())].into();

        let state = ClusterState {
            node_labels: vec![master.clone(), master.clone(), worker],
            ..Default::default()
        };

        assert_eq!(state.count_nodes_matching(&master), 2);
        assert_eq!(state.count_nodes_matching(&BTreeMap::new()), 3);
    }
}
