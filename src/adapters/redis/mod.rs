//! Redis adapters - shared fast cache and per-user session index.
//!
//! Both adapters share one multiplexed connection and one key namespace:
//! `{prefix}session:{id}` for cached records and
//! `{prefix}user_sessions:{user}` for index sets. Every call is bounded by
//! the configured timeout.

mod session_cache;
mod user_session_index;

pub use session_cache::RedisSessionCache;
pub use user_session_index::RedisUserSessionIndex;

use std::future::Future;
use std::time::Duration;

use crate::domain::foundation::{DomainError, SessionId, UserId};

/// Key layout shared by the Redis adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedisKeys {
    prefix: String,
}

impl RedisKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn session(&self, id: &SessionId) -> String {
        format!("{}session:{}", self.prefix, id)
    }

    pub fn user_sessions(&self, user_id: &UserId) -> String {
        format!("{}user_sessions:{}", self.prefix, user_id)
    }
}

/// Runs a Redis call under `timeout`, mapping both failure kinds to
/// cache errors.
async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(DomainError::cache(format!("Redis {} failed: {}", operation, e))),
        Err(_) => Err(DomainError::timeout(format!("redis {}", operation))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    #[test]
    fn keys_carry_prefix_and_namespace() {
        let keys = RedisKeys::new("smartshop:");
        assert_eq!(
            keys.session(&SessionId::new("abc").unwrap()),
            "smartshop:session:abc"
        );
        assert_eq!(
            keys.user_sessions(&UserId::new("u1")),
            "smartshop:user_sessions:u1"
        );
    }

    #[test]
    fn empty_prefix_yields_bare_keys() {
        let keys = RedisKeys::default();
        assert_eq!(keys.session(&SessionId::new("abc").unwrap()), "session:abc");
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_reports_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, redis::RedisError>(())
        };
        let err = bounded(Duration::from_millis(50), "get", slow)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Timeout);
    }
}
