use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;
use tradeflow_models::{session_id_for, Session, TradeRecord};

use crate::error::StoreError;
use crate::hot_cache::HotCache;
use crate::store::{unique_session_id, SessionMutator, SessionStore};

const SCHEMA_DDL: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id  TEXT NOT NULL UNIQUE,
    user_id     TEXT NOT NULL,
    symbol      TEXT NOT NULL,
    status      TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    body_json   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions (user_id, seq);

CREATE TABLE IF NOT EXISTS trades (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    trade_id    TEXT NOT NULL,
    session_id  TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    body_json   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_trades_user ON trades (user_id, seq);
";

const DEFAULT_CACHE_CAPACITY: u64 = 10_000;
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Durable session store on a single SQLite file.
///
/// Sessions are stored as JSON bodies with a few indexed columns alongside.
/// Recently touched sessions are kept in a moka hot cache, which is only
/// written while the connection lock is held so it never runs ahead of or
/// behind the database.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    cache: HotCache,
}

impl SqliteSessionStore {
    /// Open (or create) the history file in WAL mode.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA_DDL)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            cache: HotCache::new(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL),
        }
    }

    /// Replace the hot cache with one of the given size and TTL.
    pub fn with_hot_cache(mut self, max_capacity: u64, ttl: Duration) -> Self {
        self.cache = HotCache::new(max_capacity, ttl);
        self
    }

    fn load(conn: &Connection, session_id: &str) -> Result<Option<Session>, StoreError> {
        let body: Option<String> = conn
            .prepare_cached("SELECT body_json FROM sessions WHERE session_id = ?1")?
            .query_row(rusqlite::params![session_id], |row| row.get(0))
            .optional()?;
        match body {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn exists(conn: &Connection, session_id: &str) -> Result<bool, StoreError> {
        Ok(conn
            .prepare_cached("SELECT 1 FROM sessions WHERE session_id = ?1")?
            .exists(rusqlite::params![session_id])?)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn create(&self, user_id: &str, symbol: &str) -> Result<Session, StoreError> {
        let created_at = Utc::now();
        let conn = self.conn.lock().await;

        let session_id = unique_session_id(session_id_for(user_id, symbol, created_at), |c| {
            Self::exists(&conn, c)
        })?;
        let session = Session::new(session_id.clone(), user_id, symbol, created_at);

        conn.execute(
            "INSERT INTO sessions \
             (session_id, user_id, symbol, status, created_at, updated_at, body_json) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                session.session_id,
                session.user_id,
                session.symbol,
                session.status.as_str(),
                session.created_at.to_rfc3339(),
                session.updated_at.to_rfc3339(),
                serde_json::to_string(&session)?,
            ],
        )?;
        self.cache.put(&session).await;

        debug!(session_id = %session_id, "Created session");
        Ok(session)
    }

    async fn get(&self, session_id: &str) -> Result<Session, StoreError> {
        if let Some(session) = self.cache.get(session_id).await {
            return Ok(session);
        }

        let conn = self.conn.lock().await;
        let session = Self::load(&conn, session_id)?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;
        self.cache.put(&session).await;
        Ok(session)
    }

    async fn update(
        &self,
        session_id: &str,
        mutator: SessionMutator,
    ) -> Result<Session, StoreError> {
        let conn = self.conn.lock().await;
        let mut session = Self::load(&conn, session_id)?
            .ok_or_else(|| StoreError::NotFound(session_id.to_string()))?;

        mutator(&mut session)?;

        conn.execute(
            "UPDATE sessions SET status = ?2, updated_at = ?3, body_json = ?4 \
             WHERE session_id = ?1",
            rusqlite::params![
                session.session_id,
                session.status.as_str(),
                session.updated_at.to_rfc3339(),
                serde_json::to_string(&session)?,
            ],
        )?;
        self.cache.put(&session).await;
        Ok(session)
    }

    async fn append_trade(&self, user_id: &str, trade: TradeRecord) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO trades (trade_id, session_id, user_id, created_at, body_json) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                trade.trade_id,
                trade.session_id,
                user_id,
                trade.executed_at.to_rfc3339(),
                serde_json::to_string(&trade)?,
            ],
        )?;
        debug!(user_id = %user_id, trade_id = %trade.trade_id, "Appended trade");
        Ok(())
    }

    async fn list_sessions_by_user(&self, user_id: &str) -> Result<Vec<Session>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare_cached("SELECT body_json FROM sessions WHERE user_id = ?1 ORDER BY seq")?;
        let bodies = stmt
            .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|json| Ok(serde_json::from_str(json)?))
            .collect()
    }

    async fn list_trades_by_user(&self, user_id: &str) -> Result<Vec<TradeRecord>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare_cached("SELECT body_json FROM trades WHERE user_id = ?1 ORDER BY seq")?;
        let bodies = stmt
            .query_map(rusqlite::params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        bodies
            .iter()
            .map(|json| Ok(serde_json::from_str(json)?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mutator;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use tradeflow_models::{
        AnalysisResult, AnalysisType, Decision, SessionStatus, Signal, StepKind, TradeAction,
        TradeOutcome,
    };

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            symbol: "AAPL".to_string(),
            analysis_type: AnalysisType::Technical,
            signal: Signal::Bullish,
            confidence: dec!(0.75),
            price: Some(dec!(150.00)),
            reasoning: Some("up 2.5%".to_string()),
            raw_payload: serde_json::json!({"recommendation": "BUY"}),
        }
    }

    fn trade(session_id: &str) -> TradeRecord {
        TradeRecord {
            trade_id: "t-1".to_string(),
            session_id: session_id.to_string(),
            symbol: "AAPL".to_string(),
            action: TradeAction::Buy,
            quantity: 100,
            price: dec!(150.00),
            outcome: TradeOutcome::accepted(None),
            executed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_get_update() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let session = store.create("alice", "AAPL").await.unwrap();
        assert_eq!(store.get(&session.session_id).await.unwrap(), session);

        let updated = store
            .update(&session.session_id, mutator(|s| s.mark_analyzed(analysis())))
            .await
            .unwrap();
        assert_eq!(updated.status, SessionStatus::Analyzed);
        assert_eq!(store.get(&session.session_id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn create_surfaces_lookup_errors() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        store
            .conn
            .lock()
            .await
            .execute_batch("DROP TABLE sessions")
            .unwrap();

        let err = store.create("alice", "AAPL").await.unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));
    }

    #[tokio::test]
    async fn reads_fall_through_to_sqlite_after_cache_expiry() {
        let store = SqliteSessionStore::open_in_memory()
            .unwrap()
            .with_hot_cache(100, Duration::from_millis(20));
        let session = store.create("alice", "AAPL").await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        let fetched = store.get(&session.session_id).await.unwrap();
        assert_eq!(fetched, session);
    }

    #[tokio::test]
    async fn same_second_creates_get_distinct_ids() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let a = store.create("alice", "AAPL").await.unwrap();
        let b = store.create("alice", "AAPL").await.unwrap();
        assert_ne!(a.session_id, b.session_id);
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        assert!(matches!(
            store.get("nope").await.unwrap_err(),
            StoreError::NotFound(_)
        ));
        assert!(matches!(
            store.update("nope", mutator(|_| Ok(()))).await.unwrap_err(),
            StoreError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn failed_mutator_is_not_persisted() {
        let store = SqliteSessionStore::open_in_memory().unwrap();
        let session = store.create("alice", "AAPL").await.unwrap();

        let result = store
            .update(
                &session.session_id,
                mutator(|s| {
                    s.record_step(StepKind::TradeRequested, None);
                    s.mark_skipped(Decision {
                        action: TradeAction::Hold,
                        reason: "neutral".to_string(),
                    })
                }),
            )
            .await;
        assert!(matches!(result, Err(StoreError::InvalidTransition(_))));
        assert_eq!(store.get(&session.session_id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        let path = path.to_str().unwrap();

        let session_id = {
            let store = SqliteSessionStore::open(path).unwrap();
            let s1 = store.create("alice", "AAPL").await.unwrap();
            store.create("alice", "TSLA").await.unwrap();
            store.append_trade("alice", trade(&s1.session_id)).await.unwrap();
            s1.session_id
        };

        let store = SqliteSessionStore::open(path).unwrap();
        let sessions = store.list_sessions_by_user("alice").await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].session_id, session_id);
        assert_eq!(sessions[1].symbol, "TSLA");

        let trades = store.list_trades_by_user("alice").await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].session_id, session_id);
        assert!(store.list_trades_by_user("bob").await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_for_distinct_users() {
        let store = Arc::new(SqliteSessionStore::open_in_memory().unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.create(&format!("user-{i}"), "AAPL").await.unwrap()
            }));
        }
        for handle in handles {
            let session = handle.await.unwrap();
            assert!(session.session_id.starts_with("session-user-"));
        }

        for i in 0..16 {
            let listed = store.list_sessions_by_user(&format!("user-{i}")).await.unwrap();
            assert_eq!(listed.len(), 1);
        }
    }
}
