//! Abacus to Pipedrive bridge API.

use abasync_api::{build_router, logging, AppConfig, AppState};
use tokio::net::TcpListener;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Load configuration (fail-fast on missing required values)
    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.log_filter, config.log_format);

    let addr = config.listen_addr;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        company = %config.company,
        "Starting abasync API"
    );

    let state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to initialize application state");
            eprintln!("FATAL: {e}");
            std::process::exit(1);
        }
    };

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, %addr, "Failed to bind listener");
            std::process::exit(1);
        }
    };

    info!(%addr, "Listening");
    if let Err(e) = axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to install shutdown handler");
    }
    info!("Shutdown signal received");
}
