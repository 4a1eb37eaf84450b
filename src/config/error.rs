//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid log filter: {0}")]
    InvalidLogLevel(String),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid timeout for {0}")]
    InvalidTimeout(&'static str),

    #[error("Idle timeout must be positive")]
    InvalidIdleTimeout,

    #[error("Sweep interval must be positive")]
    InvalidSweepInterval,

    #[error("Cache TTL ({cache_ttl_secs}s) must exceed the idle timeout ({idle_timeout_secs}s)")]
    CacheTtlNotLooser {
        cache_ttl_secs: u64,
        idle_timeout_secs: u64,
    },
}
