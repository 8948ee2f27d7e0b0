use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisType, Signal};
use crate::trade::TradeAction;

/// Body of `POST /analyze` on the market analyst.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzeRequest {
    pub symbol: String,
    pub analysis_type: AnalysisType,
    /// Correlation id only; the analyst keeps no session state.
    pub session_id: String,
}

/// Response of `POST /analyze` as produced by the reference analyst.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub symbol: String,
    pub analysis_type: AnalysisType,
    pub signal: Signal,
    pub recommendation: TradeAction,
    pub confidence: Decimal,
    pub price: Decimal,
    /// Indicator detail backing the recommendation.
    pub analysis: serde_json::Value,
    pub reasoning: String,
    pub timestamp: DateTime<Utc>,
}

/// Body of `POST /execute-trade` on the stock trader.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecuteTradeRequest {
    pub symbol: String,
    pub action: TradeAction,
    /// Signed so that non-positive quantities reach validation instead of
    /// failing deserialization.
    pub quantity: i64,
    /// None = trade at the trader's reference price.
    #[serde(default)]
    pub price: Option<Decimal>,
    pub session_id: String,
}

fn default_quantity() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

/// Body of `POST /trading-workflow` on the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRequest {
    pub user_id: String,
    pub symbol: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(rename = "auto-execute", alias = "auto_execute", default = "default_true")]
    pub auto_execute: bool,
    /// Falls back to the orchestrator's configured default.
    #[serde(default)]
    pub analysis_type: Option<AnalysisType>,
}

/// Body of `POST /natural-language-trading` on the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NaturalLanguageRequest {
    pub query: String,
    pub user_id: String,
}

/// Response of `POST /execute-trade` as produced by the reference trader.
///
/// `status` is `EXECUTED` for a fill and `NO_ACTION` for a HOLD.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeConfirmation {
    pub trade_id: String,
    pub session_id: String,
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: u32,
    pub price: Decimal,
    pub total_value: Decimal,
    pub status: String,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

/// Reachability of one service as seen from the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unreachable,
}

/// Body of `GET /services/health` on the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServicesHealth {
    pub orchestrator: HealthStatus,
    pub market_analyst: HealthStatus,
    pub stock_trader: HealthStatus,
    pub store_backend: String,
    pub timestamp: DateTime<Utc>,
}
