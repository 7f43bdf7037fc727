use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::Handle;
use clap::Parser;
use snippetbox::{
    app_state::AppState,
    cleanup,
    config::{AppConfig, Cli, ConfigError},
    database::{initialize_database, DatabaseError},
    logging::{init_logging, LogFormat},
    models::{SqliteSnippetStore, SqliteUserStore},
    server::{build_router, tls},
    sessions::session_layer,
};
use thiserror::Error;
use tower_sessions_sqlx_store::SqliteStore;
use tracing::{error, info, warn};

const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Logging error: {0}")]
    Logging(String),
    #[error("Database initialization error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Session store migration error: {0}")]
    SessionStore(#[from] sqlx::Error),
    #[error("TLS error: {0}")]
    Tls(#[from] tls::TlsError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not resolve listen address {0}")]
    Address(String),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    init_logging(LogFormat::from_env()).map_err(|e| StartupError::Logging(e.to_string()))?;
    info!(target: "startup", "starting snippetbox");

    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;
    info!(target: "startup", debug = config.debug, "configuration loaded");

    let db_pool = initialize_database(&config.database).await?;

    let session_store = SqliteStore::new(db_pool.clone());
    session_store.migrate().await?;
    let cleanup_task =
        cleanup::spawn_session_cleanup(session_store.clone(), cleanup::SESSION_CLEANUP_INTERVAL);

    let state = AppState::new(
        Arc::new(SqliteSnippetStore::new(db_pool.clone())),
        Arc::new(SqliteUserStore::new(db_pool.clone())),
        config.clone(),
    );
    let app = build_router(state, session_layer(session_store, &config.session));

    let addr = resolve_listen_addr(&config).await?;

    let handle = Handle::new();
    tokio::spawn(shutdown_on_ctrl_c(handle.clone()));

    if config.tls.enabled {
        let rustls_config = tls::rustls_config(&config.tls)?;
        info!(target: "startup", "listening on https://{addr}");
        axum_server::bind_rustls(addr, rustls_config)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        warn!(target: "startup", "TLS is disabled; serving plain HTTP");
        info!(target: "startup", "listening on http://{addr}");
        axum_server::bind(addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    }

    cleanup_task.abort();
    db_pool.close().await;
    info!(target: "startup", "server stopped");

    Ok(())
}

/// Resolve the configured host name (e.g. `localhost`) to a socket address.
async fn resolve_listen_addr(config: &AppConfig) -> Result<SocketAddr, StartupError> {
    let target = format!("{}:{}", config.server.bind_addr, config.server.port);
    let resolved = tokio::net::lookup_host(&target).await?.next();
    resolved.ok_or(StartupError::Address(target))
}

async fn shutdown_on_ctrl_c(handle: Handle) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!(target: "startup", "shutdown signal received, draining connections");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE_PERIOD));
        }
        Err(err) => error!(target: "startup", %err, "failed to listen for shutdown signal"),
    }
}
