//! Hooks that adapt the controller Deployment to run in a management cluster
//! while driving a separate guest cluster.

use std::collections::BTreeMap;

use crate::core::client::kube_resources::{
    Container, EmptyDirVolumeSource, Quantity, ResourceRequirements, SecretVolumeSource, Volume,
};
use crate::domain::hooks::{HookContext, WorkloadHook};
use crate::domain::workload::container_ext::{mount, read_only_mount};
use crate::domain::workload::{ContainerExt, WorkloadSpec};
use crate::errors::AppError;

pub const HOSTED_PRIORITY_CLASS: &str = "hypershift-control-plane";
pub const HOSTED_KUBECONFIG_VOLUME: &str = "hosted-kubeconfig";
pub const HOSTED_KUBECONFIG_SECRET: &str = "admin-kubeconfig";
pub const HOSTED_KUBECONFIG_DIR: &str = "/etc/hosted-kubernetes";
pub const HOSTED_KUBECONFIG_PATH: &str = "/etc/hosted-kubernetes/kubeconfig";
pub const BOUND_TOKEN_VOLUME: &str = "bound-sa-token";
pub const BOUND_TOKEN_DIR: &str = "/var/run/secrets/openshift/serviceaccount";
pub const METRICS_CERT_VOLUME: &str = "metrics-serving-cert";
pub const TOKEN_MINTER_CONTAINER: &str = "token-minter";

/// Sidecars that only make sense next to a kubelet-managed service account.
pub const SIDECAR_DENYLIST: [&str; 5] = [
    "driver-kube-rbac-proxy",
    "provisioner-kube-rbac-proxy",
    "attacher-kube-rbac-proxy",
    "resizer-kube-rbac-proxy",
    "snapshotter-kube-rbac-proxy",
];

/// Sidecars that talk to the guest API server.
pub const SIDECAR_ALLOWLIST: [&str; 4] = [
    "csi-provisioner",
    "csi-attacher",
    "csi-snapshotter",
    "csi-resizer",
];

pub struct PriorityClassHook;

impl WorkloadHook for PriorityClassHook {
    fn name(&self) -> &'static str {
        "HostedPriorityClass"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.set_priority_class(HOSTED_PRIORITY_CLASS);
        Ok(spec)
    }
}

pub struct HostedKubeconfigVolumeHook;

impl WorkloadHook for HostedKubeconfigVolumeHook {
    fn name(&self) -> &'static str {
        "HostedKubeconfigVolume"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.upsert_volume(Volume {
            name: HOSTED_KUBECONFIG_VOLUME.to_string(),
            secret: Some(SecretVolumeSource {
                secret_name: Some(HOSTED_KUBECONFIG_SECRET.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        Ok(spec)
    }
}

/// Token projection needs a kubelet of the guest cluster, which the management
/// cluster does not have. The token minter fills the directory instead.
pub struct BoundTokenVolumeHook;

impl WorkloadHook for BoundTokenVolumeHook {
    fn name(&self) -> &'static str {
        "HostedBoundTokenVolume"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.update_volumes_named(BOUND_TOKEN_VOLUME, |volume| {
            *volume = Volume {
                name: BOUND_TOKEN_VOLUME.to_string(),
                empty_dir: Some(EmptyDirVolumeSource {
                    medium: Some("Memory".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            };
        });
        Ok(spec)
    }
}

pub struct MetricsCertVolumeHook;

impl WorkloadHook for MetricsCertVolumeHook {
    fn name(&self) -> &'static str {
        "HostedMetricsCertVolume"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.remove_volume(METRICS_CERT_VOLUME);
        Ok(spec)
    }
}

pub struct SidecarDenylistHook;

impl WorkloadHook for SidecarDenylistHook {
    fn name(&self) -> &'static str {
        "HostedSidecarDenylist"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.retain_containers(|c| !SIDECAR_DENYLIST.contains(&c.name.as_str()));
        Ok(spec)
    }
}

pub struct SidecarKubeconfigHook;

impl WorkloadHook for SidecarKubeconfigHook {
    fn name(&self) -> &'static str {
        "HostedSidecarKubeconfig"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.update_containers(|container| {
            if !SIDECAR_ALLOWLIST.contains(&container.name.as_str()) {
                return;
            }
            container.ensure_arg("--kubeconfig=$(KUBECONFIG)");
            container.upsert_env("KUBECONFIG", HOSTED_KUBECONFIG_PATH);
            container.upsert_volume_mount(read_only_mount(
                HOSTED_KUBECONFIG_VOLUME,
                HOSTED_KUBECONFIG_DIR,
            ));
        });
        Ok(spec)
    }
}

pub struct TokenMinterSidecarHook {
    image: String,
}

impl TokenMinterSidecarHook {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
        }
    }

    fn container(&self) -> Container {
        let requests: BTreeMap<String, Quantity> = [
            ("cpu".to_string(), Quantity("10m".to_string())),
            ("memory".to_string(), Quantity("10Mi".to_string())),
        ]
        .into();

        Container {
            name: TOKEN_MINTER_CONTAINER.to_string(),
            image: Some(self.image.clone()),
            image_pull_policy: Some("IfNotPresent".to_string()),
            command: Some(vec![
                "/usr/bin/control-plane-operator".to_string(),
                "token-minter".to_string(),
            ]),
            args: Some(vec![
                "--service-account-namespace=openshift-cluster-csi-drivers".to_string(),
                "--service-account-name=aws-ebs-csi-driver-controller-sa".to_string(),
                "--token-audience=openshift".to_string(),
                format!("--token-file={BOUND_TOKEN_DIR}/token"),
                format!("--kubeconfig={HOSTED_KUBECONFIG_PATH}"),
            ]),
            resources: Some(ResourceRequirements {
                requests: Some(requests),
                ..Default::default()
            }),
            volume_mounts: Some(vec![
                mount(BOUND_TOKEN_VOLUME, BOUND_TOKEN_DIR),
                read_only_mount(HOSTED_KUBECONFIG_VOLUME, HOSTED_KUBECONFIG_DIR),
            ]),
            termination_message_policy: Some("FallbackToLogsOnError".to_string()),
            ..Default::default()
        }
    }
}

impl WorkloadHook for TokenMinterSidecarHook {
    fn name(&self) -> &'static str {
        "HostedTokenMinter"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.upsert_container(self.container());
        Ok(spec)
    }
}

/// Availability policy is not passed down from the hosted cluster yet, so the
/// controller always runs one replica.
pub struct HostedReplicasHook;

impl WorkloadHook for HostedReplicasHook {
    fn name(&self) -> &'static str {
        "HostedReplicas"
    }

    fn apply(&self, mut spec: WorkloadSpec, _: &HookContext<'_>) -> Result<WorkloadSpec, AppError> {
        spec.set_replicas(1);
        Ok(spec)
    }
}
