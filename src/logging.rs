use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use crate::config::OperatorConfig;
use crate::errors::AppError;

/// Swaps the active tracing filter at runtime.
pub trait LogFilterSink: Send + Sync {
    /// Directive the process started with.
    fn base_directive(&self) -> &str;

    fn set_directive(&self, directive: &str) -> Result<(), AppError>;
}

/// Handle on the installed filter layer.
pub struct ReloadableFilter {
    handle: reload::Handle<EnvFilter, Registry>,
    base: String,
}

impl LogFilterSink for ReloadableFilter {
    fn base_directive(&self) -> &str {
        &self.base
    }

    fn set_directive(&self, directive: &str) -> Result<(), AppError> {
        let filter = EnvFilter::try_new(directive)
            .map_err(|e| AppError::ConfigurationError(format!("invalid log directive {directive:?}: {e}")))?;
        self.handle
            .reload(filter)
            .map_err(|e| AppError::InternalServerError(format!("reloading log filter: {e}")))
    }
}

/// Installs the global subscriber. `RUST_LOG` wins over `LOG_LEVEL`.
///
/// The returned guard flushes the file writer on drop and must be held by `main`.
pub fn init_tracing(config: &OperatorConfig) -> (Option<WorkerGuard>, ReloadableFilter) {
    let base = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|d| EnvFilter::try_new(d).is_ok())
        .unwrap_or_else(|| config.log_level.clone());
    let (filter, handle) = reload::Layer::new(EnvFilter::new(&base));

    let (file_layer, guard) = match config.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "ebs-csi-operator.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .with(file_layer)
        .try_init();

    (guard, ReloadableFilter { handle, base })
}
