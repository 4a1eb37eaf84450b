//! In-memory per-user session index.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, SessionId, UserId};
use crate::ports::UserSessionIndex;

#[derive(Debug, Clone)]
pub struct InMemoryUserSessionIndex {
    sets: Arc<RwLock<HashMap<UserId, HashSet<SessionId>>>>,
    online: Arc<AtomicBool>,
}

impl Default for InMemoryUserSessionIndex {
    fn default() -> Self {
        Self {
            sets: Arc::new(RwLock::new(HashMap::new())),
            online: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryUserSessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with a cache error.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), DomainError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DomainError::cache("in-memory index offline"))
        }
    }
}

#[async_trait]
impl UserSessionIndex for InMemoryUserSessionIndex {
    async fn add(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError> {
        self.check_online()?;
        self.sets
            .write()
            .await
            .entry(user_id.clone())
            .or_default()
            .insert(session_id.clone());
        Ok(())
    }

    async fn remove(&self, user_id: &UserId, session_id: &SessionId) -> Result<(), DomainError> {
        self.check_online()?;
        let mut sets = self.sets.write().await;
        if let Some(set) = sets.get_mut(user_id) {
            set.remove(session_id);
            if set.is_empty() {
                sets.remove(user_id);
            }
        }
        Ok(())
    }

    async fn members(&self, user_id: &UserId) -> Result<HashSet<SessionId>, DomainError> {
        self.check_online()?;
        Ok(self
            .sets
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
