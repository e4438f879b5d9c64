//! In-memory session store with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::intake::FlowSession;

/// One entry per live session.
///
/// Each session sits behind its own mutex so a slow sink call only blocks
/// requests for that session; the map lock is never held across an await
/// on a session.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<FlowSession>>>>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        })
    }

    pub async fn insert(&self, session: FlowSession) -> Arc<Mutex<FlowSession>> {
        let id = session.id;
        let slot = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, Arc::clone(&slot));
        debug!(session_id = %id, "Session stored");
        slot
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<FlowSession>>> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Drop sessions untouched for longer than the idle timeout. Sessions
    /// locked by an in-flight request are left alone. Returns the number
    /// removed.
    pub async fn expire_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(session) => (now - session.updated_at)
                .to_std()
                .map(|idle| idle <= self.idle_timeout)
                .unwrap_or(true),
            Err(_) => true,
        });
        let expired = before - sessions.len();
        if expired > 0 {
            info!(count = expired, "Expired idle intake sessions");
        }
        expired
    }
}

/// Spawn a background task that sweeps idle sessions every `interval`.
pub fn spawn_expiry_task(store: Arc<SessionStore>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval);
        loop {
            interval.tick().await;
            store.expire_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::FlowCatalog;
    use crate::intake::catalog::SURVEY_FLOW;

    fn session() -> FlowSession {
        FlowCatalog::standard().unwrap().get(SURVEY_FLOW).unwrap().start()
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert!(store.is_empty().await);

        let s = session();
        let id = s.id;
        store.insert(s).await;
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(id).await.unwrap().lock().await.id, id);

        assert!(store.remove(id).await);
        assert!(!store.remove(id).await);
        assert!(store.get(id).await.is_none());
    }

    #[tokio::test]
    async fn expires_only_idle_sessions() {
        let store = SessionStore::new(Duration::from_secs(600));

        let mut stale = session();
        stale.updated_at = Utc::now() - chrono::Duration::minutes(30);
        let stale_id = stale.id;
        store.insert(stale).await;

        let fresh = session();
        let fresh_id = fresh.id;
        store.insert(fresh).await;

        assert_eq!(store.expire_idle().await, 1);
        assert!(store.get(stale_id).await.is_none());
        assert!(store.get(fresh_id).await.is_some());
    }

    #[tokio::test]
    async fn busy_sessions_survive_expiry() {
        let store = SessionStore::new(Duration::from_secs(1));

        let mut stale = session();
        stale.updated_at = Utc::now() - chrono::Duration::minutes(30);
        let id = stale.id;
        let slot = store.insert(stale).await;

        let guard = slot.lock().await;
        assert_eq!(store.expire_idle().await, 0);
        drop(guard);
        assert_eq!(store.expire_idle().await, 1);
        assert!(store.get(id).await.is_none());
    }
}
