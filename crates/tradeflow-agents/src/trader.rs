use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tradeflow_models::{ExecuteTradeRequest, HealthStatus, TradeAction, TradeOutcome, TradeRecord};
use uuid::Uuid;

use crate::analyst::decimal_from;
use crate::error::AgentError;
use crate::http::ServiceClient;

pub const STOCK_TRADER: &str = "stock-trader";

/// Order execution venue. Mockable for testing.
#[async_trait]
pub trait StockTrader: Send + Sync {
    async fn execute_trade(
        &self,
        symbol: &str,
        action: TradeAction,
        quantity: i64,
        price: Decimal,
        session_id: &str,
    ) -> Result<TradeRecord, AgentError>;

    async fn health(&self) -> HealthStatus;
}

/// Check an order before it leaves the process. Returns the quantity as u32.
pub fn validate_order(symbol: &str, quantity: i64, price: Decimal) -> Result<u32, AgentError> {
    if symbol.trim().is_empty() {
        return Err(AgentError::InvalidRequest("symbol must not be empty".to_string()));
    }
    if quantity <= 0 {
        return Err(AgentError::InvalidRequest(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    let quantity = u32::try_from(quantity)
        .map_err(|_| AgentError::InvalidRequest(format!("quantity {quantity} is too large")))?;
    if price <= Decimal::ZERO {
        return Err(AgentError::InvalidRequest(format!(
            "price must be positive, got {price}"
        )));
    }
    if price.checked_mul(Decimal::from(quantity)).is_none() {
        return Err(AgentError::InvalidRequest(format!(
            "order value {quantity} x {price} is out of range"
        )));
    }
    Ok(quantity)
}

/// A stock trader reached over HTTP (`POST /execute-trade`).
pub struct HttpStockTrader {
    client: ServiceClient,
}

impl HttpStockTrader {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            client: ServiceClient::new(STOCK_TRADER, base_url, request_timeout, health_timeout)?,
        })
    }
}

#[async_trait]
impl StockTrader for HttpStockTrader {
    async fn execute_trade(
        &self,
        symbol: &str,
        action: TradeAction,
        quantity: i64,
        price: Decimal,
        session_id: &str,
    ) -> Result<TradeRecord, AgentError> {
        let quantity = validate_order(symbol, quantity, price)?;

        let request = ExecuteTradeRequest {
            symbol: symbol.to_string(),
            action,
            quantity: i64::from(quantity),
            price: Some(price),
            session_id: session_id.to_string(),
        };
        let payload = self.client.post_json("/execute-trade", &request).await?;
        normalize_trade(self.client.service(), &request, quantity, payload)
    }

    async fn health(&self) -> HealthStatus {
        self.client.health().await
    }
}

/// The subset of a trader reply the client cares about.
#[derive(Debug, Deserialize)]
struct TradeReply {
    #[serde(default)]
    trade_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    executed_at: Option<DateTime<Utc>>,
}

fn normalize_trade(
    service: &str,
    request: &ExecuteTradeRequest,
    quantity: u32,
    payload: Value,
) -> Result<TradeRecord, AgentError> {
    let reply: TradeReply = serde_json::from_value(payload)
        .map_err(|e| AgentError::invalid_response(service, e.to_string()))?;

    let outcome = match (&reply.error, reply.status.as_deref()) {
        (Some(err), _) if !err.is_null() => {
            let reason = err
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            TradeOutcome::rejected(reason)
        }
        (_, Some(status)) => match status.trim().to_ascii_uppercase().as_str() {
            "EXECUTED" | "ACCEPTED" | "NO_ACTION" => TradeOutcome::accepted(reply.message.clone()),
            "REJECTED" => TradeOutcome::rejected(
                reply
                    .reason
                    .clone()
                    .or_else(|| reply.message.clone())
                    .unwrap_or_else(|| "rejected by trader".to_string()),
            ),
            other => {
                return Err(AgentError::invalid_response(
                    service,
                    format!("unknown trade status {other:?}"),
                ))
            }
        },
        _ => return Err(AgentError::invalid_response(service, "missing trade status")),
    };

    let price = reply
        .price
        .as_ref()
        .and_then(decimal_from)
        .or(request.price)
        .unwrap_or(Decimal::ZERO);

    Ok(TradeRecord {
        trade_id: reply
            .trade_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        session_id: request.session_id.clone(),
        symbol: request.symbol.clone(),
        action: request.action,
        quantity,
        price,
        outcome,
        executed_at: reply.executed_at.unwrap_or_else(Utc::now),
    })
}
