//! Redis set per user: `{prefix}user_sessions:{user}`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::collections::HashSet;
use std::time::Duration;

use crate::domain::foundation::{DomainError, SessionId, UserId};
use crate::ports::UserSessionIndex;

use super::{bounded, RedisKeys};

#[derive(Clone)]
pub struct RedisUserSessionIndex {
    conn: MultiplexedConnection,
    keys: RedisKeys,
    timeout: Duration,
}

impl RedisUserSessionIndex {
    pub fn new(conn: MultiplexedConnection, keys: RedisKeys, timeout: Duration) -> Self {
        Self {
            conn,
            keys,
            timeout,
        }
    }
}

#[async_trait]
impl UserSessionIndex for RedisUserSessionIndex {
    async fn add(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError> {
        let key = self.keys.user_sessions(user_id);
        let mut conn = self.conn.clone();

        bounded(
            self.timeout,
            "SADD",
            conn.sadd::<_, _, ()>(&key, session_id.as_str()),
        )
        .await
    }

    async fn remove(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError> {
        let key = self.keys.user_sessions(user_id);
        let mut conn = self.conn.clone();

        bounded(
            self.timeout,
            "SREM",
            conn.srem::<_, _, ()>(&key, session_id.as_str()),
        )
        .await
    }

    async fn members(&self, user_id: &UserId) -> Result<HashSet<SessionId>, DomainError> {
        let key = self.keys.user_sessions(user_id);
        let mut conn = self.conn.clone();

        let raw: HashSet<String> = bounded(self.timeout, "SMEMBERS", conn.smembers(&key)).await?;

        // Blank members can only come from foreign writers; skip them.
        Ok(raw
            .into_iter()
            .filter_map(|member| SessionId::new(member).ok())
            .collect())
    }
}

impl std::fmt::Debug for RedisUserSessionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisUserSessionIndex")
            .field("keys", &self.keys)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
