use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tradeflow_models::{
    AnalysisType, Decision, HealthStatus, Session, SessionError, StepKind, TradeAction,
    TradeRecord, WorkflowConfig, WorkflowParams, WorkflowRequest,
};
use tradeflow_store::{mutator, SessionStore};
use tracing::{info, warn};

use crate::analyst::{MarketAnalyst, MARKET_ANALYST};
use crate::error::AgentError;
use crate::policy::DecisionPolicy;
use crate::trader::{StockTrader, STOCK_TRADER};

const MAX_SYMBOL_LEN: usize = 10;

/// Trim and upper-case a ticker, rejecting anything that cannot be one.
///
/// A ticker starts with a letter and otherwise holds letters, digits, `.`
/// or `-` (e.g. `BRK.B`).
pub fn normalize_symbol(raw: &str) -> Result<String, AgentError> {
    let symbol = raw.trim().to_ascii_uppercase();
    let mut chars = symbol.chars();
    let valid = match chars.next() {
        Some(first) => {
            first.is_ascii_uppercase()
                && symbol.len() <= MAX_SYMBOL_LEN
                && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '.' || c == '-')
        }
        None => false,
    };
    if valid {
        Ok(symbol)
    } else {
        Err(AgentError::InvalidRequest(format!("malformed symbol: {raw:?}")))
    }
}

/// Drives `analyze → decide → execute` for one session at a time.
pub struct WorkflowEngine {
    analyst: Arc<dyn MarketAnalyst>,
    trader: Arc<dyn StockTrader>,
    store: Arc<dyn SessionStore>,
    policy: DecisionPolicy,
    default_analysis_type: AnalysisType,
    upstream_timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(
        analyst: Arc<dyn MarketAnalyst>,
        trader: Arc<dyn StockTrader>,
        store: Arc<dyn SessionStore>,
        config: &WorkflowConfig,
    ) -> Self {
        Self {
            analyst,
            trader,
            store,
            policy: DecisionPolicy::new(config.min_confidence),
            default_analysis_type: config.default_analysis_type,
            upstream_timeout: Duration::from_secs(config.upstream_timeout_seconds),
        }
    }

    /// Override the per-call upstream bound.
    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn run(&self, request: &WorkflowRequest) -> Result<Session, AgentError> {
        self.run_with(
            &request.user_id,
            &request.symbol,
            request.quantity,
            request.auto_execute,
            request.analysis_type.unwrap_or(self.default_analysis_type),
        )
        .await
    }

    pub async fn run_workflow(
        &self,
        user_id: &str,
        symbol: &str,
        quantity: i64,
        auto_execute: bool,
    ) -> Result<Session, AgentError> {
        self.run_with(
            user_id,
            symbol,
            quantity,
            auto_execute,
            self.default_analysis_type,
        )
        .await
    }

    /// Run one workflow to a terminal state.
    ///
    /// Invalid input is rejected before anything is stored. Once a session
    /// exists, upstream failures are recorded on it and the FAILED session is
    /// returned as `Ok`; only store failures surface as `Err`.
    pub async fn run_with(
        &self,
        user_id: &str,
        symbol: &str,
        quantity: i64,
        auto_execute: bool,
        analysis_type: AnalysisType,
    ) -> Result<Session, AgentError> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(AgentError::InvalidRequest("user_id must not be empty".to_string()));
        }
        let symbol = normalize_symbol(symbol)?;
        if quantity <= 0 {
            return Err(AgentError::InvalidRequest(format!(
                "quantity must be positive, got {quantity}"
            )));
        }
        let quantity = u32::try_from(quantity)
            .map_err(|_| AgentError::InvalidRequest(format!("quantity {quantity} is too large")))?;

        let start = Instant::now();
        let session = self.store.create(user_id, &symbol).await?;
        let session_id = session.session_id.clone();
        info!(
            session_id = %session_id,
            user_id = %user_id,
            symbol = %symbol,
            quantity,
            auto_execute,
            "Starting workflow"
        );

        let params = WorkflowParams {
            quantity,
            auto_execute,
            analysis_type,
        };
        self.store
            .update(
                &session_id,
                mutator(move |s| {
                    s.params = Some(params);
                    s.record_step(StepKind::WorkflowStarted, None);
                    s.record_step(
                        StepKind::AnalysisRequested,
                        Some(analysis_type.to_string()),
                    );
                    Ok(())
                }),
            )
            .await?;

        let analysis = match self
            .bounded(
                MARKET_ANALYST,
                self.analyst.analyze(&symbol, analysis_type, &session_id),
            )
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => return self.fail(&session_id, e).await,
        };

        let decision = self.policy.decide(&analysis);
        let price = analysis.price;
        let session = self
            .store
            .update(&session_id, mutator(move |s| s.mark_analyzed(analysis)))
            .await?;

        if decision.action == TradeAction::Hold || !auto_execute {
            let decision = if auto_execute {
                decision
            } else {
                Decision {
                    reason: format!("{}; auto-execute disabled", decision.reason),
                    ..decision
                }
            };
            let session = self
                .store
                .update(&session_id, mutator(move |s| s.mark_skipped(decision)))
                .await?;
            info!(
                session_id = %session_id,
                elapsed_ms = start.elapsed().as_millis(),
                "Workflow skipped trade"
            );
            return Ok(session);
        }

        let Some(price) = price else {
            return self
                .fail(
                    &session_id,
                    AgentError::invalid_response(MARKET_ANALYST, "analysis carried no price"),
                )
                .await;
        };

        let detail = format!("{} {} {} @ {}", decision.action, quantity, session.symbol, price);
        self.store
            .update(
                &session_id,
                mutator(move |s| {
                    s.record_step(StepKind::TradeRequested, Some(detail));
                    Ok(())
                }),
            )
            .await?;

        let trade = match self
            .bounded(
                STOCK_TRADER,
                self.trader.execute_trade(
                    &symbol,
                    decision.action,
                    i64::from(quantity),
                    price,
                    &session_id,
                ),
            )
            .await
        {
            Ok(trade) => trade,
            Err(e) => return self.fail(&session_id, e).await,
        };

        let recorded: TradeRecord = trade.clone();
        let session = self
            .store
            .update(
                &session_id,
                mutator(move |s| s.mark_executed(decision, recorded)),
            )
            .await?;
        self.store.append_trade(user_id, trade).await?;

        info!(
            session_id = %session_id,
            elapsed_ms = start.elapsed().as_millis(),
            "Workflow executed trade"
        );
        Ok(session)
    }

    async fn bounded<T>(
        &self,
        service: &str,
        call: impl Future<Output = Result<T, AgentError>>,
    ) -> Result<T, AgentError> {
        match tokio::time::timeout(self.upstream_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::unavailable(
                service,
                format!("no response within {:?}", self.upstream_timeout),
            )),
        }
    }

    /// Record `error` on the session and hand the FAILED session back.
    async fn fail(&self, session_id: &str, error: AgentError) -> Result<Session, AgentError> {
        if let AgentError::Store(_) = error {
            return Err(error);
        }
        warn!(session_id = %session_id, error = %error, "Workflow failed");

        let failure = SessionError {
            kind: error.kind(),
            message: error.to_string(),
        };
        Ok(self
            .store
            .update(session_id, mutator(move |s| s.mark_failed(failure)))
            .await?)
    }

    pub async fn session(&self, session_id: &str) -> Result<Session, AgentError> {
        Ok(self.store.get(session_id).await?)
    }

    /// A user's sessions in creation order, optionally only the `limit` most recent.
    pub async fn sessions_for(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Session>, AgentError> {
        let sessions = self.store.list_sessions_by_user(user_id).await?;
        Ok(most_recent(sessions, limit))
    }

    pub async fn trades_for(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<TradeRecord>, AgentError> {
        let trades = self.store.list_trades_by_user(user_id).await?;
        Ok(most_recent(trades, limit))
    }

    pub async fn analyst_health(&self) -> HealthStatus {
        self.analyst.health().await
    }

    pub async fn trader_health(&self) -> HealthStatus {
        self.trader.health().await
    }
}

fn most_recent<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        let skip = items.len().saturating_sub(limit);
        items.drain(..skip);
    }
    items
}
