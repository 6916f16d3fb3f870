// Kube-rs based Kubernetes client
pub mod kube_client;
pub mod kube_resources;
pub mod openshift;
pub mod store;
pub mod listers;

// Writes and probes
pub mod applier;
pub mod capability;
pub mod operator_client;

// Static assets
pub mod manifests;
