use std::net::SocketAddr;

use axum::Router;
use common::{env::ensure_env, utils::logging::init_logging_from_env};
use configs::AppConfig;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use service::maps::provider_from_config;

use crate::errors::StartupError;
use crate::routes;
use crate::state::ServerState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

async fn connect_database(cfg: &AppConfig) -> Result<DatabaseConnection, StartupError> {
    let db = models::db::connect_with_config(&cfg.database)
        .await
        .map_err(|e| StartupError::Database(e.to_string()))?;
    if cfg.database.run_migrations {
        Migrator::up(&db, None)
            .await
            .map_err(|e| StartupError::Database(format!("migrations failed: {e}")))?;
        info!("database migrations applied");
    }
    Ok(db)
}

/// Create the first administrator when credentials are configured and none exists yet.
async fn bootstrap_admin(state: &ServerState, cfg: &AppConfig) -> Result<(), StartupError> {
    let (Some(email), Some(password)) = (cfg.auth.admin_email.as_deref(), cfg.auth.admin_password.as_deref()) else {
        return Ok(());
    };
    match state.auth_svc.ensure_admin(email, password).await {
        Ok(Some(admin)) => info!(user_id = %admin.id, email = %admin.email, "bootstrap admin created"),
        Ok(None) => info!("admin account already present"),
        Err(e) => return Err(StartupError::Runtime(format!("admin bootstrap failed: {e}"))),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Assemble state and router from configuration. Exposed for tests.
pub async fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    let db = connect_database(cfg).await?;
    let routing = provider_from_config(&cfg.maps)?;
    let state = ServerState::new(db, cfg, routing);
    bootstrap_admin(&state, cfg).await?;
    Ok(routes::build_router(state, build_cors()))
}

/// Public entry: build the app and run the HTTP server until Ctrl+C.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    init_logging_from_env();

    let cfg = AppConfig::load_and_validate().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    ensure_env(&cfg.server.log_dir).await?;
    if !cfg.maps.enabled() {
        warn!("no maps API key configured; geocoding and ETA lookups are disabled");
    }

    let app = build_app(&cfg).await?;

    let addr: SocketAddr = cfg
        .server
        .bind_addr()
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bind address: {e}")))?;
    info!(%addr, "starting chocomap server");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}
