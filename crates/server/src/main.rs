mod config;
mod routes;

use std::sync::Arc;

use siphon_core::ExtractionService;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;

const DEFAULT_LOG_FILTER: &str = "siphon_server=info,siphon_core=info,tower_http=info";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let config = ServerConfig::from_env();
    let service = Arc::new(ExtractionService::with_browser(config.service.clone()));
    let app = routes::router(Arc::clone(&service), config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;
    info!(
        addr = %listener.local_addr()?,
        max_concurrent = config.service.max_concurrent,
        max_retries = config.service.retry.max_retries,
        "Extraction server listening"
    );

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    service.gate().close();
    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
