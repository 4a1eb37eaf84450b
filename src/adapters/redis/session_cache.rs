//! Redis-backed session cache.
//!
//! Records are stored as JSON strings under `{prefix}session:{id}` with
//! `SET ... EX`, so every put restarts the TTL.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::SessionRecord;
use crate::ports::SessionCache;

use super::{bounded, RedisKeys};

#[derive(Clone)]
pub struct RedisSessionCache {
    conn: MultiplexedConnection,
    keys: RedisKeys,
    timeout: Duration,
}

impl RedisSessionCache {
    pub fn new(conn: MultiplexedConnection, keys: RedisKeys, timeout: Duration) -> Self {
        Self {
            conn,
            keys,
            timeout,
        }
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError> {
        let key = self.keys.session(id);
        let mut conn = self.conn.clone();

        let raw: Option<String> = bounded(self.timeout, "GET", conn.get(&key)).await?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record: &SessionRecord, ttl: Duration) -> Result<(), DomainError> {
        let key = self.keys.session(record.session_id());
        let json = serde_json::to_string(record)?;
        let mut conn = self.conn.clone();

        bounded(
            self.timeout,
            "SET",
            redis::cmd("SET")
                .arg(&key)
                .arg(json)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
        let key = self.keys.session(id);
        let mut conn = self.conn.clone();

        bounded(self.timeout, "DEL", conn.del::<_, ()>(&key)).await
    }
}

impl std::fmt::Debug for RedisSessionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSessionCache")
            .field("keys", &self.keys)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
