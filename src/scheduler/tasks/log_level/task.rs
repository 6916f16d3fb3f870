use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::core::client::listers::OperatorSource;
use crate::logging::LogFilterSink;
use crate::scheduler::controller_loop::Reconciler;

/// Tracing directive for the operator's own `operatorLogLevel`.
pub fn operator_directive(level: Option<&str>, base: &str) -> String {
    match level {
        Some("Debug") => format!("{base},ebs_csi_operator=debug"),
        Some("Trace") => format!("{base},ebs_csi_operator=trace"),
        Some("TraceAll") => "trace".to_string(),
        _ => base.to_string(),
    }
}

/// Follows `spec.operatorLogLevel` by swapping the tracing filter in place.
pub struct LogLevelController {
    operator: Arc<dyn OperatorSource>,
    sink: Arc<dyn LogFilterSink>,
    applied: Mutex<String>,
}

impl LogLevelController {
    pub fn new(operator: Arc<dyn OperatorSource>, sink: Arc<dyn LogFilterSink>) -> Self {
        let applied = Mutex::new(sink.base_directive().to_string());
        Self {
            operator,
            sink,
            applied,
        }
    }
}

#[async_trait]
impl Reconciler for LogLevelController {
    fn name(&self) -> &str {
        "LogLevel"
    }

    async fn sync(&self) -> Result<()> {
        let Some(cr) = self.operator.operator() else {
            debug!(controller = "LogLevel", "operator resource not cached yet, skipping");
            return Ok(());
        };

        let level = cr.spec.operator_log_level.as_deref();
        let directive = operator_directive(level, self.sink.base_directive());

        let mut applied = self.applied.lock().await;
        if *applied == directive {
            return Ok(());
        }
        self.sink
            .set_directive(&directive)
            .with_context(|| format!("failed to apply operator log level {level:?}"))?;
        info!(level = level.unwrap_or("Normal"), %directive, "Operator log level changed");
        *applied = directive;
        Ok(())
    }
}
