//! End-to-end workflow scenarios against the deterministic fakes.
//!
//! Each test wires a `WorkflowEngine` to a `FakeMarketAnalyst`, a
//! `FakeStockTrader` and a real session store, then checks the session the
//! engine leaves behind.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tradeflow_agents::test_support::{FailureMode, FakeMarketAnalyst, FakeStockTrader};
use tradeflow_agents::{
    AgentError, NaturalLanguageRouter, StaticSymbolResolver, WorkflowEngine,
};
use tradeflow_models::{
    AnalysisType, ErrorKind, SessionStatus, StepKind, TradeAction, WorkflowConfig,
    WorkflowRequest,
};
use tradeflow_store::{MemorySessionStore, SessionStore, SqliteSessionStore};

struct Harness {
    analyst: Arc<FakeMarketAnalyst>,
    trader: Arc<FakeStockTrader>,
    store: Arc<dyn SessionStore>,
    engine: Arc<WorkflowEngine>,
}

fn harness_with(
    analyst: FakeMarketAnalyst,
    trader: FakeStockTrader,
    store: Arc<dyn SessionStore>,
    config: WorkflowConfig,
) -> Harness {
    let analyst = Arc::new(analyst);
    let trader = Arc::new(trader);
    let engine = Arc::new(WorkflowEngine::new(
        analyst.clone(),
        trader.clone(),
        store.clone(),
        &config,
    ));
    Harness {
        analyst,
        trader,
        store,
        engine,
    }
}

fn harness(analyst: FakeMarketAnalyst, trader: FakeStockTrader) -> Harness {
    harness_with(
        analyst,
        trader,
        Arc::new(MemorySessionStore::new()),
        WorkflowConfig::default(),
    )
}

fn steps(session: &tradeflow_models::Session) -> Vec<StepKind> {
    session.steps.iter().map(|s| s.step).collect()
}

#[tokio::test]
async fn bullish_auto_execute_buys_requested_quantity() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());

    let session = h.engine.run_workflow("alice", "AAPL", 100, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Executed);
    assert!(session.session_id.starts_with("session-alice-AAPL-"));
    let trade = session.trade.as_ref().unwrap();
    assert_eq!(trade.action, TradeAction::Buy);
    assert_eq!(trade.quantity, 100);
    assert_eq!(trade.price, dec!(150.00));
    assert_eq!(trade.session_id, session.session_id);
    assert!(session.analysis.is_some());
    assert_eq!(
        session.summary.as_deref(),
        Some("Analyzed AAPL: BUY recommendation. Status: EXECUTED")
    );
    assert_eq!(
        steps(&session),
        vec![
            StepKind::WorkflowStarted,
            StepKind::AnalysisRequested,
            StepKind::AnalysisCompleted,
            StepKind::TradeRequested,
            StepKind::TradeCompleted,
        ]
    );

    assert_eq!(h.analyst.calls(), 1);
    assert_eq!(h.trader.calls(), 1);
    let trades = h.store.list_trades_by_user("alice").await.unwrap();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].trade_id, trade.trade_id);
}

#[tokio::test]
async fn bearish_signal_sells() {
    let h = harness(FakeMarketAnalyst::bearish(), FakeStockTrader::new());
    let session = h.engine.run_workflow("bob", "TSLA", 5, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Executed);
    assert_eq!(session.trade.unwrap().action, TradeAction::Sell);
}

#[tokio::test]
async fn hold_never_calls_trader() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());

    let session = h.engine.run_workflow("alice", "GOOGL", 10, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Skipped);
    assert_eq!(session.decision.unwrap().action, TradeAction::Hold);
    assert!(session.trade.is_none());
    assert_eq!(h.trader.calls(), 0);
    assert!(h.store.list_trades_by_user("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn auto_execute_off_never_calls_trader() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());

    let session = h.engine.run_workflow("alice", "AAPL", 10, false).await.unwrap();

    assert_eq!(session.status, SessionStatus::Skipped);
    let decision = session.decision.unwrap();
    assert_eq!(decision.action, TradeAction::Buy);
    assert!(decision.reason.contains("auto-execute disabled"));
    assert_eq!(h.trader.calls(), 0);
}

#[tokio::test]
async fn low_confidence_is_downgraded_to_hold() {
    let config = WorkflowConfig {
        min_confidence: Some(dec!(0.9)),
        ..WorkflowConfig::default()
    };
    let h = harness_with(
        FakeMarketAnalyst::bullish(),
        FakeStockTrader::new(),
        Arc::new(MemorySessionStore::new()),
        config,
    );

    let session = h.engine.run_workflow("alice", "AAPL", 10, true).await.unwrap();
    assert_eq!(session.status, SessionStatus::Skipped);
    assert_eq!(session.decision.unwrap().action, TradeAction::Hold);
    assert_eq!(h.trader.calls(), 0);
}

#[tokio::test]
async fn analyst_unreachable_fails_without_trading() {
    let h = harness(
        FakeMarketAnalyst::failing(FailureMode::Unavailable),
        FakeStockTrader::new(),
    );

    let session = h.engine.run_workflow("alice", "AAPL", 100, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_ref().unwrap().kind, ErrorKind::UpstreamUnavailable);
    assert!(session.analysis.is_none());
    assert_eq!(h.trader.calls(), 0);
    assert_eq!(steps(&session).last(), Some(&StepKind::WorkflowFailed));
}

#[tokio::test]
async fn analyst_error_status_and_garbage_map_to_kinds() {
    for (mode, kind) in [
        (FailureMode::ErrorStatus(500), ErrorKind::UpstreamError),
        (FailureMode::Garbage, ErrorKind::InvalidResponse),
    ] {
        let h = harness(FakeMarketAnalyst::failing(mode), FakeStockTrader::new());
        let session = h.engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();
        assert_eq!(session.status, SessionStatus::Failed);
        assert_eq!(session.error.as_ref().unwrap().kind, kind);
    }
}

#[tokio::test]
async fn slow_analyst_is_bounded_by_engine_timeout() {
    let analyst = FakeMarketAnalyst::bullish().with_delay(Duration::from_millis(500));
    let analyst = Arc::new(analyst);
    let trader = Arc::new(FakeStockTrader::new());
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let engine = WorkflowEngine::new(
        analyst.clone(),
        trader.clone(),
        store,
        &WorkflowConfig::default(),
    )
    .with_upstream_timeout(Duration::from_millis(50));

    let session = engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_ref().unwrap().kind, ErrorKind::UpstreamUnavailable);
    assert_eq!(trader.calls(), 0);
}

#[tokio::test]
async fn trader_failure_keeps_analysis() {
    let h = harness(
        FakeMarketAnalyst::bullish(),
        FakeStockTrader::failing(FailureMode::ErrorStatus(503)),
    );

    let session = h.engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_ref().unwrap().kind, ErrorKind::UpstreamError);
    assert!(session.analysis.is_some());
    assert!(session.trade.is_none());
    assert!(h.store.list_trades_by_user("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn rejected_order_is_recorded() {
    let h = harness(
        FakeMarketAnalyst::bullish(),
        FakeStockTrader::rejecting("insufficient buying power"),
    );

    let session = h.engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Executed);
    let trade = session.trade.unwrap();
    assert!(!trade.outcome.is_accepted());
    assert_eq!(trade.outcome.reason.as_deref(), Some("insufficient buying power"));
}

#[tokio::test]
async fn analysis_without_price_fails_before_trading() {
    let h = harness(
        FakeMarketAnalyst::new(tradeflow_models::Signal::Bullish, dec!(0.8), None),
        FakeStockTrader::new(),
    );

    let session = h.engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();

    assert_eq!(session.status, SessionStatus::Failed);
    assert_eq!(session.error.as_ref().unwrap().kind, ErrorKind::InvalidResponse);
    assert!(session.analysis.is_some());
    assert_eq!(h.trader.calls(), 0);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_anything_is_stored() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());

    for (user, symbol, quantity) in [
        ("alice", "AAPL", 0),
        ("alice", "AAPL", -3),
        ("", "AAPL", 1),
        ("alice", "", 1),
        ("alice", "12$%", 1),
    ] {
        let err = h
            .engine
            .run_workflow(user, symbol, quantity, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)), "{err}");
    }

    assert_eq!(h.analyst.calls(), 0);
    assert!(h.store.list_sessions_by_user("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn symbol_is_normalized() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());
    let session = h.engine.run_workflow("alice", " msft ", 1, true).await.unwrap();
    assert_eq!(session.symbol, "MSFT");
    assert!(session.session_id.starts_with("session-alice-MSFT-"));
}

#[tokio::test]
async fn request_analysis_type_overrides_default() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());
    let request = WorkflowRequest {
        user_id: "alice".to_string(),
        symbol: "AAPL".to_string(),
        quantity: 100,
        auto_execute: true,
        analysis_type: Some(AnalysisType::Fundamental),
    };

    let session = h.engine.run(&request).await.unwrap();
    assert_eq!(
        session.analysis.unwrap().analysis_type,
        AnalysisType::Fundamental
    );
    assert_eq!(
        session.params.unwrap().analysis_type,
        AnalysisType::Fundamental
    );
}

#[tokio::test]
async fn repeated_gets_are_identical() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let session = h.engine.run_workflow("alice", "AAPL", 1, true).await.unwrap();

    let first = h.engine.session(&session.session_id).await.unwrap();
    let second = h.engine.session(&session.session_id).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, session);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let err = h.engine.session("session-ghost-AAPL-0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_for_one_user_do_not_interfere() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let symbols = ["AAPL", "GOOGL", "TSLA", "MSFT", "AMZN", "NVDA", "META", "NFLX"];

    let mut handles = Vec::new();
    for symbol in symbols {
        let engine = Arc::clone(&h.engine);
        handles.push(tokio::spawn(async move {
            engine.run_workflow("carol", symbol, 10, true).await
        }));
    }

    let mut ids = HashSet::new();
    for (handle, symbol) in handles.into_iter().zip(symbols) {
        let session = handle.await.unwrap().unwrap();
        assert_eq!(session.status, SessionStatus::Executed);
        assert_eq!(session.symbol, symbol);
        assert_eq!(session.trade.as_ref().unwrap().symbol, symbol);
        assert!(ids.insert(session.session_id));
    }

    let sessions = h.store.list_sessions_by_user("carol").await.unwrap();
    assert_eq!(sessions.len(), symbols.len());
    assert!(sessions.iter().all(|s| s.status.is_terminal()));
    assert_eq!(
        h.store.list_trades_by_user("carol").await.unwrap().len(),
        symbols.len()
    );
}

#[tokio::test]
async fn same_second_same_symbol_runs_get_unique_ids() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());
    let a = h.engine.run_workflow("dave", "AAPL", 1, true).await.unwrap();
    let b = h.engine.run_workflow("dave", "AAPL", 1, true).await.unwrap();
    assert_ne!(a.session_id, b.session_id);
}

#[tokio::test]
async fn listing_limit_keeps_most_recent_in_order() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());
    for symbol in ["AAPL", "GOOGL", "TSLA"] {
        h.engine.run_workflow("erin", symbol, 1, true).await.unwrap();
    }

    let all = h.engine.sessions_for("erin", None).await.unwrap();
    assert_eq!(all.len(), 3);
    let recent: Vec<String> = h
        .engine
        .sessions_for("erin", Some(2))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.symbol)
        .collect();
    assert_eq!(recent, vec!["GOOGL", "TSLA"]);
    assert!(h.engine.sessions_for("nobody", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn sqlite_backend_runs_the_same_workflow() {
    let store: Arc<dyn SessionStore> = Arc::new(SqliteSessionStore::open_in_memory().unwrap());
    let h = harness_with(
        FakeMarketAnalyst::bullish(),
        FakeStockTrader::new(),
        store,
        WorkflowConfig::default(),
    );

    let session = h.engine.run_workflow("alice", "AAPL", 100, true).await.unwrap();
    assert_eq!(session.status, SessionStatus::Executed);
    assert_eq!(h.store.get(&session.session_id).await.unwrap(), session);
    assert_eq!(h.store.list_trades_by_user("alice").await.unwrap().len(), 1);
}

// Natural-language routing

fn router(h: &Harness) -> NaturalLanguageRouter {
    NaturalLanguageRouter::new(Arc::new(StaticSymbolResolver), Arc::clone(&h.engine))
}

#[tokio::test]
async fn question_about_apple_analyzes_without_trading() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let router = router(&h);

    let parsed = router
        .parse("Should I buy 100 shares of Apple stock?")
        .unwrap();
    assert_eq!(parsed.symbol, "AAPL");
    assert_eq!(parsed.quantity, 100);
    assert!(!parsed.auto_execute);

    let session = router
        .route_query("Should I buy 100 shares of Apple stock?", "alice")
        .await
        .unwrap();
    assert_eq!(session.symbol, "AAPL");
    assert!(matches!(
        session.status,
        SessionStatus::Analyzed | SessionStatus::Skipped
    ));
    assert_ne!(session.status, SessionStatus::Executed);
    assert_eq!(h.trader.calls(), 0);
}

#[tokio::test]
async fn explicit_request_executes() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let session = router(&h)
        .route_query("Go ahead and place an order for 25 shares of $TSLA", "alice")
        .await
        .unwrap();

    assert_eq!(session.status, SessionStatus::Executed);
    assert_eq!(session.trade.unwrap().quantity, 25);
    assert_eq!(h.trader.calls(), 1);
}

#[tokio::test]
async fn negated_or_past_tense_queries_never_trade() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let router = router(&h);

    for query in [
        "Don't execute anything, just analyze Apple",
        "What would have happened if I executed a buy of Apple?",
        "Never place an order for TSLA",
    ] {
        let session = router.route_query(query, "alice").await.unwrap();
        assert_eq!(session.status, SessionStatus::Skipped, "{query}");
    }
    assert_eq!(h.trader.calls(), 0);
}

#[tokio::test]
async fn year_in_query_is_not_a_quantity() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());
    let parsed = router(&h).parse("Analyze Apple's 2024 earnings").unwrap();
    assert_eq!(parsed.symbol, "AAPL");
    assert_eq!(parsed.quantity, 1);
    assert_eq!(parsed.analysis_type, AnalysisType::Fundamental);
}

#[tokio::test]
async fn keywords_pick_analysis_type_and_default_quantity() {
    let h = harness(FakeMarketAnalyst::neutral(), FakeStockTrader::new());
    let router = router(&h);

    let parsed = router.parse("what does the news say about nvidia").unwrap();
    assert_eq!(parsed.symbol, "NVDA");
    assert_eq!(parsed.quantity, 1);
    assert_eq!(parsed.analysis_type, AnalysisType::Sentiment);

    let parsed = router.parse("MSFT valuation please").unwrap();
    assert_eq!(parsed.analysis_type, AnalysisType::Fundamental);
}

#[tokio::test]
async fn query_without_symbol_is_unparseable() {
    let h = harness(FakeMarketAnalyst::bullish(), FakeStockTrader::new());

    let err = router(&h)
        .route_query("what is the weather like today", "alice")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnparseableQuery);
    assert_eq!(h.analyst.calls(), 0);
    assert!(h.store.list_sessions_by_user("alice").await.unwrap().is_empty());
}
