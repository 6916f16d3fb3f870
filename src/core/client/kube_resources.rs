/// Re-export commonly used Kubernetes resource types from k8s-openapi
/// This module provides a centralized place for all K8s resource types

pub use k8s_openapi::api::core::v1::{
    ConfigMap,
    Container,
    EmptyDirVolumeSource,
    EnvVar,
    Node,
    PodSpec,
    ResourceRequirements,
    Secret,
    SecretVolumeSource,
    Volume,
    VolumeMount,
};

pub use k8s_openapi::api::apps::v1::{
    DaemonSet,
    Deployment,
};

pub use k8s_openapi::api::storage::v1::StorageClass;

pub use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;

pub use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub use crate::core::client::openshift::{
    AwsResourceTag,
    AwsServiceEndpoint,
    ClusterCSIDriver,
    ClusterCSIDriverSpec,
    ClusterCSIDriverStatus,
    Infrastructure,
    OperatorCondition,
    Proxy,
    ProxyStatus,
};
