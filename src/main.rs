//! Session cache service entry point.
//!
//! Wires configuration, logging, PostgreSQL, Redis and the expiration
//! sweeper, then runs until interrupted.

use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tokio::sync::watch;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use session_cache::adapters::{
    PostgresSessionStore, RedisKeys, RedisSessionCache, RedisUserSessionIndex, SystemClock,
};
use session_cache::application::SessionService;
use session_cache::config::AppConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config);

    let connect_options = PgConnectOptions::from_str(&config.database.url)?.options([(
        "statement_timeout",
        config.database.statement_timeout().as_millis().to_string(),
    )]);
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(Some(config.database.idle_timeout()))
        .connect_with(connect_options)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let redis = redis::Client::open(config.redis.url.as_str())?;
    let conn = redis.get_multiplexed_tokio_connection().await?;
    let keys = RedisKeys::new(config.redis.key_prefix.clone());

    // The outer bound sits just above the server-side statement timeout.
    let store_timeout = config.database.statement_timeout() + config.redis.timeout();
    let service = SessionService::new(
        Arc::new(PostgresSessionStore::new(pool.clone(), store_timeout)),
        Arc::new(RedisSessionCache::new(
            conn.clone(),
            keys.clone(),
            config.redis.timeout(),
        )),
        Arc::new(RedisUserSessionIndex::new(conn, keys, config.redis.timeout())),
        Arc::new(SystemClock),
        config.session.policy(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = service.sweeper(config.session.sweeper());
    let sweeper_handle = tokio::spawn(async move { sweeper.run(shutdown_rx).await });

    tracing::info!(
        environment = ?config.service.environment,
        idle_timeout_secs = config.session.idle_timeout_secs,
        sweep_interval_secs = config.session.sweep_interval_secs,
        "Session cache service started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    shutdown_tx.send(true).ok();
    sweeper_handle.await?;
    pool.close().await;

    tracing::info!("Session cache service stopped");
    Ok(())
}

/// JSON logs in production, human-readable otherwise. `RUST_LOG`
/// overrides the configured filter.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_filter(filter))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_filter(filter),
            )
            .init();
    }
}
