use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use shared::password::Argon2Hasher;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use squadra_api::{
    app::{self, AppState, Stores},
    config::Config,
    jobs::{JobScheduler, NotificationCleanupJob, SessionCleanupJob},
    middleware,
    services::HttpPostService,
    shutdown::shutdown_signal,
};

const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    middleware::init_logging(&config.logging).context("Failed to initialize logging")?;
    middleware::init_metrics().context("Failed to install metrics recorder")?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Squadra API");

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config)
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let stores = Stores::postgres(pool);
    match stores.notifications.stats().await {
        Ok(stats) => info!(
            total = stats.total,
            unread = stats.unread,
            expired = stats.expired,
            "Notification stats"
        ),
        Err(e) => warn!(error = %e, "Failed to read notification stats"),
    }

    let posts = Arc::new(HttpPostService::new(&config.posts)?);
    let addr = config.socket_addr()?;
    let cleanup_interval = Duration::from_secs(config.notifications.cleanup_interval_secs);
    let purge_interval = Duration::from_secs(config.session.purge_interval_secs);
    let state = AppState::new(config, stores.clone(), posts, Arc::new(Argon2Hasher::new()));

    let shutdown = CancellationToken::new();
    let mut scheduler = JobScheduler::with_token(shutdown.child_token());
    NotificationCleanupJob::new(stores.notifications.clone(), cleanup_interval).schedule(&mut scheduler);
    SessionCleanupJob::new(state.sessions.clone(), purge_interval).schedule(&mut scheduler);
    scheduler.start();

    let app = app::create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}
