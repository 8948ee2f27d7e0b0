//! Reference stock trader: simulated fills into an in-memory ledger.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use tradeflow_agents::{normalize_symbol, validate_order};
use tradeflow_models::{ExecuteTradeRequest, TradeAction, TradeConfirmation};
use uuid::Uuid;

use crate::api::{agent_failure, bad_request, internal, json_rejection, ApiResult};

/// Price used when an order arrives without one.
pub fn default_price() -> Decimal {
    Decimal::new(15000, 2)
}

/// Fills in arrival order, indexed by session for replay.
#[derive(Default)]
pub struct Ledger {
    fills: Vec<TradeConfirmation>,
    by_session: HashMap<String, usize>,
}

impl Ledger {
    /// Record a BUY/SELL fill, or return the earlier fill for the same session.
    ///
    /// Returns `None` when the order value does not fit in a `Decimal`; the
    /// ledger is left unchanged.
    pub fn fill(
        &mut self,
        request: &ExecuteTradeRequest,
        symbol: &str,
        quantity: u32,
        price: Decimal,
    ) -> Option<(TradeConfirmation, bool)> {
        if let Some(&idx) = self.by_session.get(&request.session_id) {
            return Some((self.fills[idx].clone(), false));
        }
        let total_value = price.checked_mul(Decimal::from(quantity))?;

        let confirmation = TradeConfirmation {
            trade_id: format!("{}-{}-{}", request.action, symbol, Uuid::new_v4()),
            session_id: request.session_id.clone(),
            symbol: symbol.to_string(),
            action: request.action,
            quantity,
            price,
            total_value,
            status: "EXECUTED".to_string(),
            message: format!("{} {} {} @ {}", request.action, quantity, symbol, price),
            executed_at: Utc::now(),
        };
        self.by_session.insert(request.session_id.clone(), self.fills.len());
        self.fills.push(confirmation.clone());
        Some((confirmation, true))
    }

    pub fn fills(&self) -> &[TradeConfirmation] {
        &self.fills
    }
}

#[derive(Default)]
pub struct TraderState {
    ledger: Mutex<Ledger>,
}

impl TraderState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize)]
pub struct TradeHistory {
    pub trades: Vec<TradeConfirmation>,
    pub total_trades: usize,
    pub last_updated: chrono::DateTime<Utc>,
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Stock Trader Service", "status": "running" }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "agent": "stock-trader" }))
}

/// POST /execute-trade
async fn execute_trade(
    State(state): State<Arc<TraderState>>,
    payload: Result<Json<ExecuteTradeRequest>, JsonRejection>,
) -> ApiResult<Json<TradeConfirmation>> {
    let Json(request) = payload.map_err(json_rejection)?;
    let symbol = normalize_symbol(&request.symbol).map_err(agent_failure)?;

    if request.action == TradeAction::Hold {
        info!(session_id = %request.session_id, symbol = %symbol, "HOLD, no order placed");
        return Ok(Json(TradeConfirmation {
            trade_id: format!("HOLD-{}", Uuid::new_v4()),
            session_id: request.session_id,
            symbol,
            action: TradeAction::Hold,
            quantity: 0,
            price: Decimal::ZERO,
            total_value: Decimal::ZERO,
            status: "NO_ACTION".to_string(),
            message: "No trade executed - HOLD recommendation".to_string(),
            executed_at: Utc::now(),
        }));
    }

    if request.session_id.trim().is_empty() {
        return Err(bad_request("session_id must not be empty"));
    }
    let price = request.price.unwrap_or_else(default_price);
    let quantity = validate_order(&symbol, request.quantity, price).map_err(agent_failure)?;

    let (confirmation, fresh) = state
        .ledger
        .lock()
        .map_err(|e| internal(format!("ledger unavailable: {e}")))?
        .fill(&request, &symbol, quantity, price)
        .ok_or_else(|| {
            bad_request(format!("order value {quantity} x {price} is out of range"))
        })?;

    if fresh {
        info!(
            session_id = %request.session_id,
            trade_id = %confirmation.trade_id,
            total_value = %confirmation.total_value,
            "Trade executed"
        );
    } else {
        info!(session_id = %request.session_id, "Replayed earlier fill");
    }
    Ok(Json(confirmation))
}

/// GET /trades/history
async fn trade_history(State(state): State<Arc<TraderState>>) -> ApiResult<Json<TradeHistory>> {
    let trades = state
        .ledger
        .lock()
        .map_err(|e| internal(format!("ledger unavailable: {e}")))?
        .fills()
        .to_vec();

    Ok(Json(TradeHistory {
        total_trades: trades.len(),
        trades,
        last_updated: Utc::now(),
    }))
}

pub fn router(state: Arc<TraderState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/execute-trade", post(execute_trade))
        .route("/trades/history", get(trade_history))
        .with_state(state)
}
