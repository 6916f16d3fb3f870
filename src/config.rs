use std::path::PathBuf;
use std::time::Duration;

use validator::{Validate, ValidationError};

use crate::domain::topology::Topology;
use crate::errors::{wiring_error, AppError};

pub const DEFAULT_NAMESPACE: &str = "openshift-cluster-csi-drivers";

/// Process configuration, read once at startup from the environment.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "validate_topology"))]
pub struct OperatorConfig {
    /// Namespace of the operator in the management cluster.
    #[validate(length(min = 1, max = 63))]
    pub namespace: String,

    /// Namespace of the driver in the workload cluster.
    #[validate(length(min = 1, max = 63))]
    pub guest_namespace: String,

    /// Kubeconfig of a second cluster; its presence selects hosted topology.
    pub guest_kubeconfig: Option<PathBuf>,

    /// Token minter sidecar image (hosted topology only).
    pub token_minter_image: Option<String>,

    #[validate(length(min = 1))]
    pub assets_dir: String,

    #[validate(range(min = 5, max = 86400))]
    pub resync_interval_secs: u64,

    #[validate(length(min = 1))]
    pub health_addr: String,

    pub log_level: String,
    pub log_dir: Option<String>,
}

fn validate_topology(config: &OperatorConfig) -> Result<(), ValidationError> {
    if config.topology() == Topology::Hosted
        && config.token_minter_image.as_deref().unwrap_or("").is_empty()
    {
        let mut err = ValidationError::new("hypershift_image");
        err.message = Some("HYPERSHIFT_IMAGE must be set when GUEST_KUBECONFIG is set".into());
        return Err(err);
    }
    Ok(())
}

impl OperatorConfig {
    /// Reads and validates the configuration from the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let resync_interval_secs = match non_empty("RESYNC_INTERVAL_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|e| wiring_error("RESYNC_INTERVAL_SECS", e))?,
            None => 60,
        };

        let config = Self {
            namespace: non_empty("OPERATOR_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into()),
            guest_namespace: DEFAULT_NAMESPACE.into(),
            guest_kubeconfig: non_empty("GUEST_KUBECONFIG").map(PathBuf::from),
            token_minter_image: non_empty("HYPERSHIFT_IMAGE"),
            assets_dir: non_empty("ASSETS_DIR").unwrap_or_else(|| "assets".into()),
            resync_interval_secs,
            health_addr: non_empty("HEALTH_ADDR").unwrap_or_else(|| "0.0.0.0:8080".into()),
            log_level: non_empty("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: non_empty("LOG_DIR"),
        };

        config
            .validate()
            .map_err(|e| wiring_error("invalid configuration", e))?;
        Ok(config)
    }

    /// Resolved once; never re-evaluated while the process runs.
    pub fn topology(&self) -> Topology {
        Topology::from_guest_kubeconfig(self.guest_kubeconfig.as_deref())
    }

    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }
}
