//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `SESSION_CACHE` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use session_cache::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Idle timeout: {:?}", config.session.idle_timeout());
//! ```

mod database;
mod error;
mod redis;
mod service;
mod session;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use redis::RedisConfig;
pub use service::{Environment, ServiceConfig};
pub use session::SessionConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Environment and log filter
    #[serde(default)]
    pub service: ServiceConfig,

    /// Durable store (PostgreSQL)
    pub database: DatabaseConfig,

    /// Shared cache and user index (Redis)
    pub redis: RedisConfig,

    /// Idle timeout, sweep interval and cache TTL
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `SESSION_CACHE` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `SESSION_CACHE__DATABASE__URL=...` -> `database.url = ...`
    /// - `SESSION_CACHE__SESSION__IDLE_TIMEOUT_SECS=900` -> `session.idle_timeout_secs = 900`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("SESSION_CACHE")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.service.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.session.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.service.is_production()
    }
}
