use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use tradeflow_models::{session_id_for, Session, TradeRecord};

use crate::error::StoreError;
use crate::store::{unique_session_id, SessionMutator, SessionStore};

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Unavailable(format!("lock poisoned: {e}"))
}

/// Process-local session store.
///
/// The index maps are behind `RwLock`s and only held for lookups and
/// inserts. Each session sits behind its own `Mutex`, so updates to one
/// session never wait on another.
///
/// Lock order is `sessions` before `user_sessions`.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
    user_sessions: RwLock<HashMap<String, Vec<String>>>,
    user_trades: RwLock<HashMap<String, Vec<TradeRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, session_id: &str) -> Result<Arc<Mutex<Session>>, StoreError> {
        self.sessions
            .read()
            .map_err(poisoned)?
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, user_id: &str, symbol: &str) -> Result<Session, StoreError> {
        let created_at = Utc::now();
        let mut sessions = self.sessions.write().map_err(poisoned)?;

        let session_id = unique_session_id(session_id_for(user_id, symbol, created_at), |c| {
            Ok::<_, StoreError>(sessions.contains_key(c))
        })?;
        let session = Session::new(session_id.clone(), user_id, symbol, created_at);
        sessions.insert(session_id.clone(), Arc::new(Mutex::new(session.clone())));

        // Still under the sessions lock so per-user order matches creation order.
        self.user_sessions
            .write()
            .map_err(poisoned)?
            .entry(user_id.to_string())
            .or_default()
            .push(session_id.clone());

        debug!(session_id = %session_id, "Created session");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Session, StoreError> {
        let entry = self.entry(session_id)?;
        let session = entry.lock().map_err(poisoned)?.clone();
        Ok(session)
    }

    async fn update(
        &self,
        session_id: &str,
        mutator: SessionMutator,
    ) -> Result<Session, StoreError> {
        let entry = self.entry(session_id)?;
        let mut guard = entry.lock().map_err(poisoned)?;

        let mut draft = guard.clone();
        mutator(&mut draft)?;
        *guard = draft.clone();
        Ok(draft)
    }

    async fn append_trade(&self, user_id: &str, trade: TradeRecord) -> Result<(), StoreError> {
        debug!(user_id = %user_id, trade_id = %trade.trade_id, "Appending trade");
        self.user_trades
            .write()
            .map_err(poisoned)?
            .entry(user_id.to_string())
            .or_default()
            .push(trade);
        Ok(())
    }

    async fn list_sessions_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let ids = self
            .user_sessions
            .read()
            .map_err(poisoned)?
            .get(user_id)
            .cloned()
            .unwrap_or_default();

        let entries: Vec<Arc<Mutex<Session>>> = {
            let sessions = self.sessions.read().map_err(poisoned)?;
            ids.iter().filter_map(|id| sessions.get(id).cloned()).collect()
        };

        entries
            .iter()
            .map(|entry| Ok(entry.lock().map_err(poisoned)?.clone()))
            .collect()
    }

    async fn list_trades_by_user(&self, user_id: &str) -> Result<Vec<TradeRecord>, StoreError> {
        Ok(self
            .user_trades
            .read()
            .map_err(poisoned)?
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
