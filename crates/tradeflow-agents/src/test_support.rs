//! Deterministic collaborators for exercising the workflow engine without a
//! network.
//!
//! Both fakes count their calls so tests can assert that a path never
//! reached the trader.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tradeflow_models::{
    AnalysisResult, AnalysisType, HealthStatus, Signal, TradeAction, TradeOutcome, TradeRecord,
};
use uuid::Uuid;

use crate::analyst::{MarketAnalyst, MARKET_ANALYST};
use crate::error::AgentError;
use crate::trader::{validate_order, StockTrader, STOCK_TRADER};

/// How a fake collaborator misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Unavailable,
    ErrorStatus(u16),
    Garbage,
}

impl FailureMode {
    fn into_error(self, service: &str) -> AgentError {
        match self {
            Self::Unavailable => AgentError::unavailable(service, "connection refused"),
            Self::ErrorStatus(status) => AgentError::UpstreamError {
                service: service.to_string(),
                status,
                body: "fake upstream error".to_string(),
            },
            Self::Garbage => AgentError::invalid_response(service, "not JSON"),
        }
    }
}

/// A market analyst that answers with a fixed signal.
pub struct FakeMarketAnalyst {
    pub signal: Signal,
    pub confidence: Decimal,
    pub price: Option<Decimal>,
    pub failure: Option<FailureMode>,
    pub delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeMarketAnalyst {
    pub fn new(signal: Signal, confidence: Decimal, price: Option<Decimal>) -> Self {
        Self {
            signal,
            confidence,
            price,
            failure: None,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn bullish() -> Self {
        Self::new(Signal::Bullish, Decimal::new(75, 2), Some(Decimal::new(15000, 2)))
    }

    pub fn bearish() -> Self {
        Self::new(Signal::Bearish, Decimal::new(70, 2), Some(Decimal::new(21000, 2)))
    }

    pub fn neutral() -> Self {
        Self::new(Signal::Neutral, Decimal::new(60, 2), Some(Decimal::new(14000, 2)))
    }

    pub fn failing(mode: FailureMode) -> Self {
        let mut fake = Self::neutral();
        fake.failure = Some(mode);
        fake
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketAnalyst for FakeMarketAnalyst {
    async fn analyze(
        &self,
        symbol: &str,
        analysis_type: AnalysisType,
        session_id: &str,
    ) -> Result<AnalysisResult, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(mode) = self.failure {
            return Err(mode.into_error(MARKET_ANALYST));
        }

        Ok(AnalysisResult {
            symbol: symbol.to_string(),
            analysis_type,
            signal: self.signal,
            confidence: self.confidence,
            price: self.price,
            reasoning: Some(format!("fake {} analysis", self.signal)),
            raw_payload: serde_json::json!({
                "symbol": symbol,
                "signal": self.signal,
                "confidence": self.confidence,
                "price": self.price,
                "session_id": session_id,
            }),
        })
    }

    async fn health(&self) -> HealthStatus {
        match self.failure {
            Some(FailureMode::Unavailable) => HealthStatus::Unreachable,
            Some(_) => HealthStatus::Unhealthy,
            None => HealthStatus::Healthy,
        }
    }
}

/// A stock trader that fills every valid order and remembers it.
#[derive(Default)]
pub struct FakeStockTrader {
    pub failure: Option<FailureMode>,
    pub reject_reason: Option<String>,
    calls: AtomicUsize,
    orders: Mutex<Vec<TradeRecord>>,
}

impl FakeStockTrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mode: FailureMode) -> Self {
        Self {
            failure: Some(mode),
            ..Self::default()
        }
    }

    pub fn rejecting(reason: &str) -> Self {
        Self {
            reject_reason: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Orders seen so far, oldest first.
    pub fn orders(&self) -> Vec<TradeRecord> {
        self.orders
            .lock()
            .map(|orders| orders.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl StockTrader for FakeStockTrader {
    async fn execute_trade(
        &self,
        symbol: &str,
        action: TradeAction,
        quantity: i64,
        price: Decimal,
        session_id: &str,
    ) -> Result<TradeRecord, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let quantity = validate_order(symbol, quantity, price)?;
        if let Some(mode) = self.failure {
            return Err(mode.into_error(STOCK_TRADER));
        }

        let outcome = match &self.reject_reason {
            Some(reason) => TradeOutcome::rejected(reason.clone()),
            None => TradeOutcome::accepted(Some("filled".to_string())),
        };
        let record = TradeRecord {
            trade_id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            symbol: symbol.to_string(),
            action,
            quantity,
            price,
            outcome,
            executed_at: Utc::now(),
        };
        if let Ok(mut orders) = self.orders.lock() {
            orders.push(record.clone());
        }
        Ok(record)
    }

    async fn health(&self) -> HealthStatus {
        match self.failure {
            Some(FailureMode::Unavailable) => HealthStatus::Unreachable,
            Some(_) => HealthStatus::Unhealthy,
            None => HealthStatus::Healthy,
        }
    }
}
