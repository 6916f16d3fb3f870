//! OpenShift API types the operator reads and writes.
//!
//! Only the fields the operator consumes are modelled; unknown fields are
//! dropped on deserialization.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Name of the cluster-scoped Infrastructure singleton.
pub const INFRASTRUCTURE_NAME: &str = "cluster";

/// Name of the cluster-wide Proxy singleton.
pub const PROXY_NAME: &str = "cluster";

/// Name of the ClusterCSIDriver this operator manages.
pub const CLUSTER_CSI_DRIVER_NAME: &str = "ebs.csi.aws.com";

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "Infrastructure",
    status = "InfrastructureStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureSpec {
    #[serde(default)]
    pub platform_spec: Option<serde_json::Value>,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureStatus {
    #[serde(default)]
    pub platform_status: Option<PlatformStatus>,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    #[serde(rename = "type", default)]
    pub type_: Option<String>,
    #[serde(default)]
    pub aws: Option<AwsPlatformStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AwsPlatformStatus {
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub resource_tags: Vec<AwsResourceTag>,
    #[serde(default)]
    pub service_endpoints: Vec<AwsServiceEndpoint>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AwsResourceTag {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AwsServiceEndpoint {
    pub name: String,
    pub url: String,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize)]
#[kube(
    group = "config.openshift.io",
    version = "v1",
    kind = "Proxy",
    status = "ProxyStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub no_proxy: Option<String>,
}

/// The effective proxy settings, including the cluster's own no-proxy list.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyStatus {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default)]
    pub no_proxy: Option<String>,
}

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "operator.openshift.io",
    version = "v1",
    kind = "ClusterCSIDriver",
    status = "ClusterCSIDriverStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCSIDriverSpec {
    #[serde(default = "default_management_state")]
    pub management_state: String,
    /// Verbosity of the driver containers.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Verbosity of this operator.
    #[serde(default)]
    pub operator_log_level: Option<String>,
    #[serde(default)]
    pub observed_config: Option<serde_json::Value>,
    #[serde(default)]
    pub unsupported_config_overrides: Option<serde_json::Value>,
}

fn default_management_state() -> String {
    "Managed".to_string()
}

impl ClusterCSIDriverSpec {
    /// Unmanaged and Removed both mean "hands off the operand".
    pub fn is_managed(&self) -> bool {
        matches!(self.management_state.as_str(), "Managed" | "Force" | "")
    }

    /// States this operator knows how to act on. `Removed` is not one of
    /// them: the operand is never uninstalled.
    pub fn supports_management_state(&self) -> bool {
        matches!(self.management_state.as_str(), "Managed" | "Force" | "Unmanaged" | "")
    }
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCSIDriverStatus {
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,
    pub observed_generation: Option<i64>,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_transition_time: Option<String>,
}
