//! Hooks shared by both topologies.

use crate::domain::hooks::{HookContext, WorkloadHook, DRIVER_CONTAINER};
use crate::domain::workload::{ContainerExt, WorkloadSpec};
use crate::errors::AppError;

pub const TRUSTED_CA_HASH_ANNOTATION: &str = "operator.openshift.io/trusted-ca-bundle-hash";
pub const EXTRA_TAGS_FLAG: &str = "--extra-tags=";
pub const VERBOSITY_FLAG: &str = "--v=";

pub struct NamespaceHook {
    namespace: String,
}

impl NamespaceHook {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl WorkloadHook for NamespaceHook {
    fn name(&self) -> &'static str {
        "Namespace"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.set_namespace(self.namespace.clone());
        Ok(spec)
    }
}

/// Rolls the pods when the cloud credentials change.
pub struct SecretHashAnnotationHook {
    annotation: String,
}

impl SecretHashAnnotationHook {
    pub fn new(secret_name: &str) -> Self {
        Self {
            annotation: format!("operator.openshift.io/secret-hash-{secret_name}"),
        }
    }
}

impl WorkloadHook for SecretHashAnnotationHook {
    fn name(&self) -> &'static str {
        "SecretHashAnnotation"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        if let Some(hash) = ctx.cluster.credentials_hash.as_deref() {
            spec.set_pod_annotation(self.annotation.clone(), hash);
        }
        Ok(spec)
    }
}

/// Copies the cluster-wide proxy settings observed into the operator config
/// (`observedConfig.targetcsiconfig.proxy`) into every container's env.
pub struct ObservedProxyHook;

impl WorkloadHook for ObservedProxyHook {
    fn name(&self) -> &'static str {
        "ObservedProxy"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let Some(proxy) = ctx
            .operator
            .observed_config
            .as_ref()
            .and_then(|c| c.pointer("/targetcsiconfig/proxy"))
            .and_then(|p| p.as_object())
        else {
            return Ok(spec);
        };

        let vars: Vec<(&str, &str)> = proxy
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.as_str(), v)))
            .collect();
        if vars.is_empty() {
            return Ok(spec);
        }

        spec.update_containers(|container| {
            for (name, value) in &vars {
                container.upsert_env(name, value);
            }
        });
        Ok(spec)
    }
}

pub struct TrustedCaBundleHook;

impl WorkloadHook for TrustedCaBundleHook {
    fn name(&self) -> &'static str {
        "TrustedCABundle"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        if let Some(hash) = ctx.cluster.trusted_ca_bundle_hash.as_deref() {
            spec.set_pod_annotation(TRUSTED_CA_HASH_ANNOTATION, hash);
        }
        Ok(spec)
    }
}

pub struct AwsRegionHook;

impl WorkloadHook for AwsRegionHook {
    fn name(&self) -> &'static str {
        "AWSRegion"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let Some(region) = ctx.cluster.region.as_deref() else {
            return Ok(spec);
        };
        spec.require_container(self.name(), DRIVER_CONTAINER)?
            .upsert_env("AWS_REGION", region);
        Ok(spec)
    }
}

/// Passes user-defined resource tags to the driver, which stamps them on every
/// volume and snapshot it creates.
pub struct CustomTagsHook;

impl WorkloadHook for CustomTagsHook {
    fn name(&self) -> &'static str {
        "CustomTags"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let tags = &ctx.cluster.resource_tags;
        if tags.is_empty() {
            return Ok(spec);
        }

        let joined = tags
            .iter()
            .map(|t| format!("{}={}", t.key, t.value))
            .collect::<Vec<_>>()
            .join(",");

        spec.require_container(self.name(), DRIVER_CONTAINER)?
            .set_prefixed_arg(EXTRA_TAGS_FLAG, &joined);
        Ok(spec)
    }
}

pub struct Ec2EndpointHook;

impl WorkloadHook for Ec2EndpointHook {
    fn name(&self) -> &'static str {
        "EC2Endpoint"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let Some(endpoint) = ctx.cluster.ec2_endpoint.as_deref() else {
            return Ok(spec);
        };
        spec.require_container(self.name(), DRIVER_CONTAINER)?
            .upsert_env("AWS_EC2_ENDPOINT", endpoint);
        Ok(spec)
    }
}

/// klog verbosity for an operator log level. Unknown levels read as Normal.
pub fn verbosity(log_level: Option<&str>) -> u8 {
    match log_level {
        Some("Debug") => 4,
        Some("Trace") => 6,
        Some("TraceAll") => 8,
        _ => 2,
    }
}

/// Sets `--v=` from the operator's log level on every container whose
/// template already passes one.
pub struct LogLevelHook;

impl WorkloadHook for LogLevelHook {
    fn name(&self) -> &'static str {
        "LogLevel"
    }

    fn apply(&self, mut spec: WorkloadSpec, ctx: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        let level = verbosity(ctx.operator.log_level.as_deref()).to_string();
        spec.update_containers(|container| {
            let has_flag = container
                .args
                .iter()
                .flatten()
                .any(|a| a.starts_with(VERBOSITY_FLAG));
            if has_flag {
                container.set_prefixed_arg(VERBOSITY_FLAG, &level);
            }
        });
        Ok(spec)
    }
}
