//! Faucet service binary

use clap::Parser;
use faucet_common::utils::logging::init_logging;
use kaspa_faucet::api::router;
use kaspa_faucet::config::Args;
use kaspa_faucet::context::open_usage_store;
use kaspa_faucet::metrics::FaucetMetrics;
use kaspa_faucet::{FaucetConfig, FaucetContext, FaucetService, GrpcNodeRpc};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};

const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = FaucetConfig::load(&args)?;
    config.validate()?;

    // Flushes the log files when dropped at the end of main.
    let _log_guards = init_logging(&config.logging())?;

    info!("Starting Kaspa Faucet v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Listen address: {}", config.listen);
    info!("  RPC server: {}", config.rpc_server);
    info!("  Network: {}", config.network());
    info!("  Send amount: {} sompi, fee: {} sompi", config.send_amount_sompi, config.fee_sompi);
    info!("  Request interval: {}s", config.request_interval_secs);

    let context = Arc::new(FaucetContext::from_config(&config)?);
    info!("Faucet address: {}", context.address());

    let store = open_usage_store(&config)?;
    let rpc = Arc::new(GrpcNodeRpc::connect(&config.rpc_server, config.rpc_timeout()).await?);
    let metrics = FaucetMetrics::new()?;

    let service = Arc::new(FaucetService::new(context, rpc.clone(), store, metrics));
    let app = router(service);

    let addr: SocketAddr = config.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => {
            // The server stopped without being asked to.
            rpc.disconnect().await;
            result??;
            return Ok(());
        }
        _ = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(());
    match tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => info!("Shutting down gracefully"),
        Ok(Ok(Err(e))) => error!("Error shutting down HTTP server: {}", e),
        Ok(Err(e)) => error!("HTTP server task failed: {}", e),
        Err(_) => warn!("In-flight requests did not finish within {:?}", GRACEFUL_SHUTDOWN_TIMEOUT),
    }
    rpc.disconnect().await;
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
