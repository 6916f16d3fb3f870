use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::core::client::listers::{OperatorSource, ProxySource};
use crate::core::client::operator_client::ObservedConfigWriter;
use crate::domain::observer::{merge_patch, observe_proxy, with_observed_proxy};
use crate::scheduler::controller_loop::Reconciler;
use crate::scheduler::tasks::managed_spec;

/// Copies the cluster proxy into `spec.observedConfig`, where the
/// observed-proxy hooks pick it up.
pub struct ConfigObserverController {
    name: String,
    proxy: Arc<dyn ProxySource>,
    operator: Arc<dyn OperatorSource>,
    writer: Arc<dyn ObservedConfigWriter>,
}

impl ConfigObserverController {
    pub fn new(
        name: impl Into<String>,
        proxy: Arc<dyn ProxySource>,
        operator: Arc<dyn OperatorSource>,
        writer: Arc<dyn ObservedConfigWriter>,
    ) -> Self {
        Self {
            name: name.into(),
            proxy,
            operator,
            writer,
        }
    }
}

#[async_trait]
impl Reconciler for ConfigObserverController {
    fn name(&self) -> &str {
        &self.name
    }

    async fn sync(&self) -> Result<()> {
        let Some(spec) = managed_spec(&self.name, self.operator.as_ref()) else {
            return Ok(());
        };

        // A missing Proxy object means no proxy.
        let proxy = self.proxy.proxy();
        let observed = observe_proxy(proxy.as_ref().and_then(|p| p.status.as_ref()));

        let current = spec.observed_config.unwrap_or_else(|| json!({}));
        let desired = with_observed_proxy(Some(&current), observed);
        if current == desired {
            debug!(controller = %self.name, "observed config up to date");
            return Ok(());
        }

        let patch = merge_patch(&current, &desired);
        self.writer
            .patch_observed_config(&patch)
            .await
            .context("failed to update observed config")?;
        info!(controller = %self.name, proxy = %desired.pointer("/targetcsiconfig/proxy").unwrap_or(&serde_json::Value::Null), "Observed proxy config changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::kube_resources::{Proxy, ProxyStatus};
    use crate::core::client::openshift::ProxySpec;
    use crate::test_support::{operator, FakeObservedConfigWriter, FixedOperator, FixedProxy};

    fn proxy(https: &str) -> Proxy {
        let mut proxy = Proxy::new("cluster", ProxySpec::default());
        proxy.status = Some(ProxyStatus {
            https_proxy: Some(https.into()),
            no_proxy: Some(".cluster.local".into()),
            ..Default::default()
        });
        proxy
    }

    fn controller(
        proxy: Option<Proxy>,
        observed: Option<Value>,
        writer: Arc<FakeObservedConfigWriter>,
    ) -> ConfigObserverController {
        let mut cr = operator("Managed");
        cr.spec.observed_config = observed;
        ConfigObserverController::new(
            "CSIConfigObserver",
            Arc::new(FixedProxy(proxy)),
            Arc::new(FixedOperator(Some(cr))),
            writer,
        )
    }

    #[tokio::test]
    async fn cluster_proxy_is_written_to_observed_config() {
        let writer = Arc::new(FakeObservedConfigWriter::default());
        controller(Some(proxy("http://proxy:3128")), None, writer.clone())
            .sync()
            .await
            .unwrap();

        assert_eq!(
            writer.patches(),
            vec![json!({
                "targetcsiconfig": {
                    "proxy": { "HTTPS_PROXY": "http://proxy:3128", "NO_PROXY": ".cluster.local" }
                }
            })]
        );
    }

    #[tokio::test]
    async fn stale_keys_are_removed_and_current_config_is_left_alone() {
        let writer = Arc::new(FakeObservedConfigWriter::default());
        let stale = json!({ "targetcsiconfig": { "proxy": { "HTTP_PROXY": "http://old:80" } } });
        controller(None, Some(stale), writer.clone()).sync().await.unwrap();
        assert_eq!(writer.patches(), vec![json!({ "targetcsiconfig": null })]);

        let writer = Arc::new(FakeObservedConfigWriter::default());
        let current = json!({
            "targetcsiconfig": {
                "proxy": { "HTTPS_PROXY": "http://proxy:3128", "NO_PROXY": ".cluster.local" }
            }
        });
        controller(Some(proxy("http://proxy:3128")), Some(current), writer.clone())
            .sync()
            .await
            .unwrap();
        assert!(writer.patches().is_empty());
    }
}
