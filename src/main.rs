//! Expense Ledger - Main Application Entry Point
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Build the ledger store (PostgreSQL pool + migrations, or in-memory)
//! 3. Build the bearer token verifier
//! 4. Spawn the recurring-expense worker
//! 5. Build the HTTP router and serve until Ctrl-C / SIGTERM

use std::sync::Arc;

use expense_ledger::{
    app::{AppState, build_router},
    config::{AuthKeySource, Config, StorageBackend},
    db,
    identity::{JwtVerifier, TokenVerifier},
    scheduler,
    store::{LedgerStore, MemoryLedgerStore, PgLedgerStore},
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(backend = ?config.storage_backend, env = ?config.app_env, "Configuration loaded");

    let store = build_store(&config).await?;
    let verifier = build_verifier(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = match config.recurring_scan_interval() {
        Some(period) => Some(scheduler::spawn_recurring_worker(
            store.clone(),
            period,
            shutdown_rx,
        )),
        None => {
            tracing::info!("Recurring worker disabled");
            None
        }
    };

    let app = build_router(AppState {
        store,
        verifier,
        expose_error_details: config.is_development(),
    });

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop the worker once the server has drained
    let _ = shutdown_tx.send(true);
    if let Some(worker) = worker {
        worker.await?;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LedgerStore>> {
    match config.storage_backend {
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is not set"))?;

            let pool = db::create_pool(url, config.database_max_connections).await?;
            tracing::info!("Database pool created");

            db::run_migrations(&pool).await?;
            tracing::info!("Database migrations complete");

            Ok(Arc::new(PgLedgerStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; data is lost on restart");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
    }
}

fn build_verifier(config: &Config) -> anyhow::Result<Arc<dyn TokenVerifier>> {
    let verifier = match config.auth_key_source()? {
        AuthKeySource::Secret(secret) => JwtVerifier::with_secret(&secret),
        AuthKeySource::Jwks(url) => {
            tracing::info!(%url, "Verifying tokens against identity provider key set");
            JwtVerifier::with_jwks(url)
        }
    }
    .issuer(config.auth_issuer.clone())
    .audience(config.auth_audience.clone());

    Ok(Arc::new(verifier))
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received");
}
