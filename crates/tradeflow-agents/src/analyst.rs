use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;
use tradeflow_models::{AnalysisResult, AnalysisType, AnalyzeRequest, HealthStatus, Signal};

use crate::error::AgentError;
use crate::http::ServiceClient;

pub const MARKET_ANALYST: &str = "market-analyst";

/// Source of market analysis. Mockable for testing.
#[async_trait]
pub trait MarketAnalyst: Send + Sync {
    async fn analyze(
        &self,
        symbol: &str,
        analysis_type: AnalysisType,
        session_id: &str,
    ) -> Result<AnalysisResult, AgentError>;

    async fn health(&self) -> HealthStatus;
}

/// A market analyst reached over HTTP (`POST /analyze`).
pub struct HttpMarketAnalyst {
    client: ServiceClient,
}

impl HttpMarketAnalyst {
    pub fn new(
        base_url: &str,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            client: ServiceClient::new(MARKET_ANALYST, base_url, request_timeout, health_timeout)?,
        })
    }
}

#[async_trait]
impl MarketAnalyst for HttpMarketAnalyst {
    async fn analyze(
        &self,
        symbol: &str,
        analysis_type: AnalysisType,
        session_id: &str,
    ) -> Result<AnalysisResult, AgentError> {
        let request = AnalyzeRequest {
            symbol: symbol.to_string(),
            analysis_type,
            session_id: session_id.to_string(),
        };
        let payload = self.client.post_json("/analyze", &request).await?;
        normalize_analysis(symbol, analysis_type, payload)
    }

    async fn health(&self) -> HealthStatus {
        self.client.health().await
    }
}

/// Turn an analyst payload into an [`AnalysisResult`].
///
/// Signal precedence: `signal`, then `analysis.price_trend`, then
/// `recommendation`. Price precedence: `price`, then `current_price`, then
/// `analysis.technical_indicators.current_price`.
pub fn normalize_analysis(
    symbol: &str,
    analysis_type: AnalysisType,
    payload: Value,
) -> Result<AnalysisResult, AgentError> {
    if !payload.is_object() {
        return Err(AgentError::invalid_response(
            MARKET_ANALYST,
            "expected a JSON object",
        ));
    }

    let signal = extract_signal(&payload).ok_or_else(|| {
        AgentError::invalid_response(MARKET_ANALYST, "no signal, price_trend or recommendation")
    })?;

    let confidence = payload
        .get("confidence")
        .and_then(decimal_from)
        .ok_or_else(|| AgentError::invalid_response(MARKET_ANALYST, "missing confidence"))?;
    if confidence < Decimal::ZERO || confidence > Decimal::ONE {
        return Err(AgentError::invalid_response(
            MARKET_ANALYST,
            format!("confidence {confidence} outside 0..1"),
        ));
    }

    let price = payload
        .get("price")
        .and_then(decimal_from)
        .or_else(|| payload.get("current_price").and_then(decimal_from))
        .or_else(|| {
            payload
                .pointer("/analysis/technical_indicators/current_price")
                .and_then(decimal_from)
        });

    let reasoning = payload
        .get("reasoning")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(AnalysisResult {
        symbol: symbol.to_string(),
        analysis_type,
        signal,
        confidence,
        price,
        reasoning,
        raw_payload: payload,
    })
}

fn extract_signal(payload: &Value) -> Option<Signal> {
    if let Some(label) = payload.get("signal").and_then(Value::as_str) {
        return Some(Signal::from_label(label));
    }
    if let Some(trend) = payload.pointer("/analysis/price_trend").and_then(Value::as_str) {
        return Some(Signal::from_label(trend));
    }
    payload
        .get("recommendation")
        .and_then(Value::as_str)
        .map(|rec| match rec.trim().to_ascii_uppercase().as_str() {
            "BUY" => Signal::Bullish,
            "SELL" => Signal::Bearish,
            _ => Signal::Neutral,
        })
}

/// Accepts JSON numbers and numeric strings.
pub(crate) fn decimal_from(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
