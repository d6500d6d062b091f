use std::time::Duration;

use axum::{routing::get, Router};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServerConfig;
use crate::receipt::ReceiptClient;
use crate::storage::ReimbursementStore;

pub mod handlers;
pub mod models;

/// Ceiling on request bodies. The API is read-only, so anything beyond a
/// generous URL-sized payload is noise.
const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Per-request timeout for the whole handler, receipt probe included.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub store: ReimbursementStore,
    pub receipt: ReceiptClient,
    pub config: ServerConfig,
}

/// Builds the application router. Split out of `run_with_config` so tests
/// can serve the exact production routing on an ephemeral listener.
pub fn build_router(state: AppState) -> Router {
    // axum 0.8 does not redirect on trailing slashes and the dataset
    // portal historically linked both shapes, so each route is mounted
    // twice.
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/reimbursements", get(handlers::list_reimbursements))
        .route("/reimbursements/", get(handlers::list_reimbursements))
        .route(
            "/reimbursements/{document_id}",
            get(handlers::get_reimbursement),
        )
        .route(
            "/reimbursements/{document_id}/",
            get(handlers::get_reimbursement),
        )
        .route(
            "/reimbursements/{document_id}/receipt",
            get(handlers::get_receipt),
        )
        .route(
            "/reimbursements/{document_id}/receipt/",
            get(handlers::get_receipt),
        )
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::new())
                .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
                .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS))),
        )
        .with_state(state)
}

pub async fn run() {
    dotenv().ok();

    // Load server configuration from environment variables
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    run_with_config(config).await;
}

pub async fn run_with_config(config: ServerConfig) {
    dotenv().ok();

    log::info!(
        "Server configuration: http={}:{}, database={}, receipt host={}",
        config.http_host,
        config.http_port,
        config.database_path,
        config.receipt_base_url
    );

    let store = match ReimbursementStore::open(&config.database_path) {
        Ok(store) => store,
        Err(e) => {
            log::error!("✗ Failed to open reimbursement store: {}", e);
            std::process::exit(1);
        }
    };

    match store.count() {
        Ok(count) => log::info!("✓ Reimbursement store ready ({} records)", count),
        Err(e) => {
            log::error!("✗ Reimbursement store is unreadable: {}", e);
            std::process::exit(1);
        }
    }

    let receipt = match ReceiptClient::new(&config.receipt_base_url, config.receipt_timeout_ms) {
        Ok(client) => client,
        Err(e) => {
            log::error!("✗ Failed to build receipt client: {}", e);
            std::process::exit(1);
        }
    };

    let app = build_router(AppState {
        store,
        receipt,
        config: config.clone(),
    });

    let http_bind_address = format!("{}:{}", config.http_host, config.http_port);
    log::info!("Starting HTTP server on {}", http_bind_address);

    let http_listener = match TcpListener::bind(&http_bind_address).await {
        Ok(listener) => {
            println!("✓ Successfully bound HTTP listener to {}", http_bind_address);
            listener
        }
        Err(e) => {
            log::error!(
                "✗ FATAL: Failed to bind HTTP listener to {}: {}",
                http_bind_address,
                e
            );
            log::error!("  Is another process using port {}?", config.http_port);
            std::process::exit(1);
        }
    };

    let http_server = axum::serve(http_listener, app);

    println!("Quotawatch server is running");
    println!("  HTTP API: http://{}", http_bind_address);

    if config.daemon {
        println!("Running in daemon mode - press Ctrl+C to stop");

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("Failed to register SIGTERM handler: {}. Server will run without graceful shutdown.", e);
                    if let Err(e) = http_server.await {
                        log::error!("HTTP server error: {:?}", e);
                    }
                    return;
                }
            };
            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => s,
                Err(e) => {
                    log::error!("Failed to register SIGINT handler: {}. Server will run without graceful shutdown.", e);
                    if let Err(e) = http_server.await {
                        log::error!("HTTP server error: {:?}", e);
                    }
                    return;
                }
            };

            tokio::select! {
                result = http_server => {
                    if let Err(e) = result {
                        log::error!("HTTP server error: {:?}", e);
                    }
                }
                _ = sigterm.recv() => println!("Received SIGTERM, shutting down..."),
                _ = sigint.recv() => println!("Received SIGINT, shutting down..."),
            }
        }

        #[cfg(windows)]
        {
            tokio::select! {
                result = http_server => {
                    if let Err(e) = result {
                        log::error!("HTTP server error: {:?}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("Received shutdown signal, shutting down...");
                }
            }
        }

        println!("Server stopped");
    } else {
        // Run HTTP server (this will block until shutdown)
        if let Err(e) = http_server.await {
            log::error!("HTTP server fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}
