use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use ebs_csi_operator::config::OperatorConfig;
use ebs_csi_operator::errors::wiring_error;
use ebs_csi_operator::logging::init_tracing;
use ebs_csi_operator::routes::app_router;
use ebs_csi_operator::wiring;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = OperatorConfig::from_env()?;
    let (_log_guard, log_filter) = init_tracing(&config);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting EBS CSI driver operator");

    let cancel = CancellationToken::new();
    let context = wiring::build(&config, Arc::new(log_filter), &cancel).await?;
    info!(topology = ?context.topology, "Operator wired");

    let listener = TcpListener::bind(&config.health_addr)
        .await
        .map_err(|e| wiring_error("health listener", e))?;
    info!("Health endpoints listening on {}", config.health_addr);

    let app = app_router().with_state(context.app_state);
    let server_cancel = cancel.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    tokio::spawn(shutdown_signal(cancel.clone()));

    let result = context.orchestrator.run(cancel).await;

    match server.await {
        Ok(Err(err)) => error!(error = %err, "health server failed"),
        Err(err) => error!(error = %err, "health server task panicked"),
        Ok(Ok(())) => {}
    }

    result
}

/// Cancels the root token on Ctrl+C or SIGTERM.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }

    cancel.cancel();
}
