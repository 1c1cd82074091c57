use std::process::ExitCode;

use tokio::net::TcpListener;
use warden_backend::{config::Config, create_app, roster};
use warden_db::Database;

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = tracing::Level::DEBUG;
    #[cfg(not(debug_assertions))]
    let log_level = tracing::Level::INFO;

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting Warden dashboard backend...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: port={}, db_path={}, body_limit={}KB, timeout={}s",
        config.port,
        config.database_path,
        config.request_body_limit / 1024,
        config.request_timeout.as_secs(),
    );

    let db = match Database::open(&config.database_path).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to open document store: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(server_ip) = &config.bootstrap_server_ip {
        if let Err(e) = roster::ensure_server(&db, server_ip, &config.bootstrap_server_name).await {
            tracing::error!("Failed to bootstrap server {}: {}", server_ip, e);
            return ExitCode::FAILURE;
        }
    }

    let app = create_app(db, config.request_body_limit, config.request_timeout);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("Server listening on {}", addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Axum server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
