use async_trait::async_trait;
use tradeflow_models::{InvalidTransition, Session, TradeRecord};

use crate::error::StoreError;

/// A partial update applied to one session under that session's lock.
///
/// Returning an error discards the update; the stored session is unchanged.
pub type SessionMutator = Box<dyn FnOnce(&mut Session) -> Result<(), InvalidTransition> + Send>;

/// Box a closure as a [`SessionMutator`].
pub fn mutator<F>(f: F) -> SessionMutator
where
    F: FnOnce(&mut Session) -> Result<(), InvalidTransition> + Send + 'static,
{
    Box::new(f)
}

/// Keyed storage of workflow sessions and per-user trade history.
///
/// Sessions are never deleted. Operations on one session id are atomic and
/// serialized; operations on different ids do not block each other beyond
/// the backend's own constraints.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Short backend name for diagnostics (e.g. "memory", "sqlite").
    fn backend(&self) -> &'static str;

    /// Create a PENDING session with a fresh, unique id.
    async fn create(&self, user_id: &str, symbol: &str) -> Result<Session, StoreError>;

    async fn get(&self, session_id: &str) -> Result<Session, StoreError>;

    /// Apply `mutator` atomically and return the updated session.
    async fn update(
        &self,
        session_id: &str,
        mutator: SessionMutator,
    ) -> Result<Session, StoreError>;

    /// Append a trade to the user's history.
    async fn append_trade(&self, user_id: &str, trade: TradeRecord) -> Result<(), StoreError>;

    /// All sessions of a user in creation order.
    async fn list_sessions_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError>;

    /// All trades of a user in the order they were recorded.
    async fn list_trades_by_user(&self, user_id: &str) -> Result<Vec<TradeRecord>, StoreError>;
}

/// Resolve id collisions by suffixing `-2`, `-3`, ... onto the base id.
///
/// A failing `exists` check aborts with its error.
pub(crate) fn unique_session_id<E>(
    base: String,
    exists: impl Fn(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !exists(&base)? {
        return Ok(base);
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if !exists(&candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}
