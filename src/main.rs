use clap::Parser;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use visitor_gateway::config::Args;
use visitor_gateway::rate_limit::sweeper;
use visitor_gateway::state::AppState;
use visitor_gateway::{PROXY_PATH, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let state = AppState::new(&args, reqwest::Client::builder().build()?);

    if let Some(every) = args.sweep_interval() {
        tokio::spawn(sweeper(state.rate_limiter.clone(), every));
    }

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Gateway running on http://localhost:{}{}", args.port, PROXY_PATH);
    match &state.backend_url {
        Some(url) => info!("Forwarding to backend at {url}"),
        None => warn!("GAS_BACKEND_URL not set, every proxy request will fail until it is configured"),
    }
    info!(
        "Rate limit: {} requests per {} ms, upstream timeout {} ms, {} retries",
        args.rate_limit, args.rate_window_ms, args.request_timeout_ms, args.max_retries
    );

    axum::serve(listener, app(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
