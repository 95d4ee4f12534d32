//! Maritime Claims - API Server Binary
//!
//! This binary starts the HTTP API server and the periodic time-bar sweep.
//!
//! # Usage
//!
//! ```bash
//! # Run against PostgreSQL
//! API_DATABASE_URL=postgres://... cargo run --bin claims-api
//!
//! # Run with the in-memory store and a bootstrap admin
//! API_STORAGE=memory API_BOOTSTRAP_ADMIN=admin cargo run --bin claims-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DB_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `API_STORAGE` - `postgres` or `memory` (default: postgres)
//! * `API_TIMEZONE` - IANA timezone that defines "today" (default: UTC)
//! * `API_SWEEP_INTERVAL_SECS` - Time-bar sweep period, 0 disables (default: 3600)
//! * `API_TIMEBAR_WARNING_DAYS` - Warning window before a deadline (default: 30)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_JSON_LOGS` - Emit JSON log lines (default: false)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::SystemClock;
use domain_claims::{ClaimService, ClaimStore, InMemoryClaimStore, LogNotifier, Role, User};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgClaimStore};
use interface_api::{
    auth::create_token,
    config::{ApiConfig, StorageBackend},
    create_router,
    jobs::spawn_timebar_sweep,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("loading API configuration")?;

    init_tracing(&config.log_level, config.json_logs);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        storage = ?config.storage,
        timezone = config.timezone.name(),
        "Starting maritime claims API server"
    );

    let store = build_store(&config).await?;
    let service = Arc::new(ClaimService::new(
        store,
        Arc::new(SystemClock::new(config.timezone)),
        Arc::new(LogNotifier),
    ));

    if let Some(username) = &config.bootstrap_admin {
        bootstrap_admin(&service, &config, username).await?;
    }

    let sweep = config
        .sweep_interval()
        .map(|period| spawn_timebar_sweep(service.clone(), period, config.timebar_warning_days));

    let app = create_router(service, config.clone());

    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweep {
        handle.abort();
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Connects the configured claim store, migrating PostgreSQL first.
async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn ClaimStore>> {
    match config.storage {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(
                DatabaseConfig::new(config.database_url.clone())
                    .max_connections(config.db_max_connections),
            )
            .await
            .context("connecting to PostgreSQL")?;

            tracing::info!("Running database migrations...");
            run_migrations(&pool).await.context("running migrations")?;

            tracing::info!("Database ready");
            Ok(Arc::new(PgClaimStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory claim store; data is lost on shutdown");
            Ok(Arc::new(InMemoryClaimStore::new()))
        }
    }
}

/// Creates an admin user on the memory backend and logs a token for it.
async fn bootstrap_admin(service: &ClaimService, config: &ApiConfig, username: &str) -> anyhow::Result<()> {
    if config.storage != StorageBackend::Memory {
        tracing::warn!("API_BOOTSTRAP_ADMIN is only honoured with the memory backend");
        return Ok(());
    }

    let admin = User::new(username, username, Role::Admin);
    service
        .store()
        .save_user(&admin)
        .await
        .context("saving bootstrap admin")?;
    let token = create_token(admin.id, &config.jwt_secret, config.jwt_expiration_secs)?;
    tracing::warn!(user_id = %admin.id, %token, "bootstrap admin created (development only)");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
