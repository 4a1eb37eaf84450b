//! Session timing configuration

use serde::Deserialize;
use std::time::Duration;

use crate::application::{ExpirationSweeperConfig, SessionPolicy};

use super::error::ValidationError;

/// Idle timeout, sweep cadence and cache TTL.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Inactivity before a session is expired, in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Time between sweeper passes, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Cache entry TTL in seconds; must exceed the idle timeout
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn policy(&self) -> SessionPolicy {
        SessionPolicy::default()
            .with_idle_timeout(self.idle_timeout())
            .with_cache_ttl(self.cache_ttl())
    }

    pub fn sweeper(&self) -> ExpirationSweeperConfig {
        ExpirationSweeperConfig::default().with_interval(self.sweep_interval())
    }

    /// The sweeper, not cache eviction, decides when a session expires, so
    /// the cache TTL has to be the looser of the two.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.idle_timeout_secs == 0 {
            return Err(ValidationError::InvalidIdleTimeout);
        }
        if self.sweep_interval_secs == 0 {
            return Err(ValidationError::InvalidSweepInterval);
        }
        if self.cache_ttl_secs <= self.idle_timeout_secs {
            return Err(ValidationError::CacheTtlNotLooser {
                cache_ttl_secs: self.cache_ttl_secs,
                idle_timeout_secs: self.idle_timeout_secs,
            });
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout(),
            sweep_interval_secs: default_sweep_interval(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_idle_timeout() -> u64 {
    30 * 60
}

fn default_sweep_interval() -> u64 {
    5 * 60
}

fn default_cache_ttl() -> u64 {
    31 * 60
}
