use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tradeflow_models::Session;

/// Recently read or written sessions, keyed by session id.
///
/// Values are shared so a hit costs one `Arc` clone until the caller needs
/// an owned copy. Entries expire after the TTL; capacity bounds the count.
pub struct HotCache {
    sessions: Cache<String, Arc<Session>>,
}

impl HotCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            sessions: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions
            .get(session_id)
            .await
            .map(|session| Session::clone(&session))
    }

    /// Cache `session` under its own id, replacing any older copy.
    pub async fn put(&self, session: &Session) {
        self.sessions
            .insert(session.session_id.clone(), Arc::new(session.clone()))
            .await;
    }
}
