//! In-memory session cache with per-entry TTL.
//!
//! Expiry is checked lazily on read. Can be switched offline to exercise
//! the degraded read path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::domain::foundation::{DomainError, SessionId};
use crate::domain::session::SessionRecord;
use crate::ports::SessionCache;

#[derive(Debug, Clone)]
struct Entry {
    record: SessionRecord,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct InMemorySessionCache {
    entries: Arc<RwLock<HashMap<SessionId, Entry>>>,
    online: Arc<AtomicBool>,
}

impl Default for InMemorySessionCache {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with a cache error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Peek at a live entry without going through the port.
    pub async fn peek(&self, id: &SessionId) -> Option<SessionRecord> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.record.clone())
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DomainError::cache("in-memory cache offline"))
        }
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get(&self, id: &SessionId) -> Result<Option<SessionRecord>, DomainError> {
        self.check_online()?;
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(id) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.record.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // Lapsed entry: drop it.
        self.entries.write().await.remove(id);
        Ok(None)
    }

    async fn put(&self, record: &SessionRecord, ttl: Duration) -> Result<(), DomainError> {
        self.check_online()?;
        self.entries.write().await.insert(
            record.session_id().clone(),
            Entry {
                record: record.clone(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> Result<(), DomainError> {
        self.check_online()?;
        self.entries.write().await.remove(id);
        Ok(())
    }
}
