//! Chooses the hook set for the controller and node workloads.

use std::path::Path;

use serde::Serialize;

use crate::domain::hooks::common::{
    AwsRegionHook, CustomTagsHook, Ec2EndpointHook, LogLevelHook, NamespaceHook, ObservedProxyHook,
    SecretHashAnnotationHook, TrustedCaBundleHook,
};
use crate::domain::hooks::hosted::{
    BoundTokenVolumeHook, HostedKubeconfigVolumeHook, HostedReplicasHook, MetricsCertVolumeHook,
    PriorityClassHook, SidecarDenylistHook, SidecarKubeconfigHook, TokenMinterSidecarHook,
};
use crate::domain::hooks::standalone::{CustomCaBundleHook, NodeReplicasHook};
use crate::domain::hooks::HookPipeline;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    /// Controller and node plugin run in the same cluster.
    Standalone,
    /// Controller runs in a management cluster and serves a guest cluster.
    Hosted,
}

impl Topology {
    /// Resolved once at startup.
    pub fn from_guest_kubeconfig(path: Option<&Path>) -> Self {
        match path {
            Some(p) if !p.as_os_str().is_empty() => Topology::Hosted,
            _ => Topology::Standalone,
        }
    }

    pub fn is_hosted(self) -> bool {
        self == Topology::Hosted
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub namespace: String,
    pub token_minter_image: Option<String>,
    pub credentials_secret: String,
}

pub fn controller_pipeline(
    topology: Topology,
    settings: &PipelineSettings,
) -> Result<HookPipeline, AppError> {
    let pipeline = match topology {
        Topology::Hosted => {
            let image = settings.token_minter_image.clone().ok_or_else(|| {
                AppError::IrrecoverableWiringError(
                    "hosted topology requires a token minter image".into(),
                )
            })?;
            HookPipeline::new()
                .with_hook(PriorityClassHook)
                .with_hook(HostedKubeconfigVolumeHook)
                .with_hook(BoundTokenVolumeHook)
                .with_hook(MetricsCertVolumeHook)
                .with_hook(SidecarDenylistHook)
                .with_hook(SidecarKubeconfigHook)
                .with_hook(TokenMinterSidecarHook::new(image))
                .with_hook(HostedReplicasHook)
        }
        Topology::Standalone => HookPipeline::new().with_hook(NodeReplicasHook),
    };

    let pipeline = pipeline
        .with_hook(NamespaceHook::new(settings.namespace.clone()))
        .with_hook(SecretHashAnnotationHook::new(&settings.credentials_secret))
        .with_hook(ObservedProxyHook);

    let pipeline = match topology {
        Topology::Standalone => pipeline.with_hook(CustomCaBundleHook),
        Topology::Hosted => pipeline,
    };

    Ok(pipeline
        .with_hook(AwsRegionHook)
        .with_hook(CustomTagsHook)
        .with_hook(Ec2EndpointHook)
        .with_hook(TrustedCaBundleHook)
        .with_hook(LogLevelHook))
}

/// The node DaemonSet always runs in the cluster it serves.
pub fn node_pipeline() -> HookPipeline {
    HookPipeline::new()
        .with_hook(ObservedProxyHook)
        .with_hook(TrustedCaBundleHook)
        .with_hook(LogLevelHook)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::kube_resources::{AwsResourceTag, ClusterCSIDriverSpec};
    use crate::core::state::cluster::cluster_state::ClusterState;
    use crate::domain::hooks::hosted::{BOUND_TOKEN_VOLUME, HOSTED_KUBECONFIG_DIR};
    use crate::domain::hooks::HookContext;
    use crate::domain::workload::{ContainerExt, WorkloadSpec};
    use crate::test_support::{container, deployment_with, volume};

    fn settings(image: Option<&str>) -> PipelineSettings {
        PipelineSettings {
            namespace: "openshift-cluster-csi-drivers".into(),
            token_minter_image: image.map(String::from),
            credentials_secret: "ebs-cloud-credentials".into(),
        }
    }

    fn controller_template() -> WorkloadSpec {
        WorkloadSpec::from_deployment(deployment_with(
            vec![
                container("csi-driver"),
                container("driver-kube-rbac-proxy"),
                container("csi-provisioner"),
            ],
            vec![volume(BOUND_TOKEN_VOLUME), volume("metrics-serving-cert")],
        ))
    }

    fn cluster() -> ClusterState {
        ClusterState {
            region: Some("us-east-1".into()),
            resource_tags: vec![
                AwsResourceTag {
                    key: "a".into(),
                    value: "1".into(),
                },
                AwsResourceTag {
                    key: "b".into(),
                    value: "2".into(),
                },
            ],
            credentials_hash: Some("hash".into()),
            custom_ca_bundle: Some("kube-cloud-config".into()),
            ..Default::default()
        }
    }

    #[test]
    fn topology_follows_guest_kubeconfig() {
        assert_eq!(Topology::from_guest_kubeconfig(None), Topology::Standalone);
        assert_eq!(
            Topology::from_guest_kubeconfig(Some(Path::new(""))),
            Topology::Standalone
        );
        assert!(Topology::from_guest_kubeconfig(Some(Path::new("/etc/guest/kubeconfig"))).is_hosted());
    }

    #[test]
    fn hook_order_is_fixed_per_topology() {
        let standalone = controller_pipeline(Topology::Standalone, &settings(None)).unwrap();
        assert_eq!(
            standalone.hook_names(),
            vec![
                "ControllerReplicas",
                "Namespace",
                "SecretHashAnnotation",
                "ObservedProxy",
                "CustomCABundle",
                "AWSRegion",
                "CustomTags",
                "EC2Endpoint",
                "TrustedCABundle",
                "LogLevel",
            ]
        );

        let hosted = controller_pipeline(Topology::Hosted, &settings(Some("img"))).unwrap();
        assert_eq!(hosted.hook_names()[0], "HostedPriorityClass");
        assert!(!hosted.hook_names().contains(&"CustomCABundle"));
        assert!(!hosted.hook_names().contains(&"ControllerReplicas"));
    }

    #[test]
    fn hosted_without_image_fails_wiring() {
        let err = controller_pipeline(Topology::Hosted, &settings(None)).err().unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn hosted_pipeline_rewires_sidecars_and_token_volume() {
        let pipeline = controller_pipeline(Topology::Hosted, &settings(Some("img"))).unwrap();
        let operator = ClusterCSIDriverSpec::default();
        let cluster = cluster();
        let ctx = HookContext {
            operator: &operator,
            cluster: &cluster,
        };

        let out = pipeline.apply(&controller_template(), &ctx).unwrap();

        assert!(out.container("driver-kube-rbac-proxy").is_none());
        let provisioner = out.container("csi-provisioner").unwrap();
        assert!(provisioner.has_arg("--kubeconfig=$(KUBECONFIG)"));
        assert!(provisioner
            .volume_mounts
            .iter()
            .flatten()
            .any(|m| m.mount_path == HOSTED_KUBECONFIG_DIR));

        let token = out.volume(BOUND_TOKEN_VOLUME).unwrap();
        assert_eq!(token.empty_dir.as_ref().unwrap().medium.as_deref(), Some("Memory"));
        assert!(out.volume("ca-bundle").is_none());
        assert_eq!(out.replicas(), Some(1));
    }

    #[test]
    fn apply_is_deterministic_and_idempotent() {
        let operator = ClusterCSIDriverSpec::default();
        let cluster = cluster();
        let ctx = HookContext {
            operator: &operator,
            cluster: &cluster,
        };

        for (topology, image) in [(Topology::Standalone, None), (Topology::Hosted, Some("img"))] {
            let pipeline = controller_pipeline(topology, &settings(image)).unwrap();
            let base = controller_template();
            let pristine = base.clone();

            let first = pipeline.apply(&base, &ctx).unwrap();
            let second = pipeline.apply(&base, &ctx).unwrap();
            assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
            assert_eq!(base, pristine);

            let again = pipeline.apply(&first, &ctx).unwrap();
            assert_eq!(again.to_json().unwrap(), first.to_json().unwrap());
        }
    }
}
