use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of analysis requested from the market analyst.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    #[default]
    Technical,
    Fundamental,
    Sentiment,
}

impl AnalysisType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Fundamental => "fundamental",
            Self::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "technical" => Ok(Self::Technical),
            "fundamental" => Ok(Self::Fundamental),
            "sentiment" => Ok(Self::Sentiment),
            other => Err(format!("unknown analysis type: {other}")),
        }
    }
}

/// Directional signal distilled from an analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Bullish,
    Bearish,
    Neutral,
}

impl Signal {
    /// Lenient mapping from the labels analysts tend to emit.
    ///
    /// Accepts trend words (`bullish`, `bearish`) as well as recommendation
    /// words (`BUY`, `strong_sell`). Anything unrecognized is neutral.
    pub fn from_label(label: &str) -> Self {
        let normalized = label.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "bullish" | "buy" | "strong_buy" | "long" | "up" => Self::Bullish,
            "bearish" | "sell" | "strong_sell" | "short" | "down" => Self::Bearish,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bullish => "bullish",
            Self::Bearish => "bearish",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized output of the market analyst, attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub symbol: String,
    pub analysis_type: AnalysisType,
    pub signal: Signal,
    /// 0.0 to 1.0 confidence reported by the analyst.
    pub confidence: Decimal,
    /// Reference price found in the payload, used to price a follow-up trade.
    pub price: Option<Decimal>,
    pub reasoning: Option<String>,
    /// The analyst's response exactly as received.
    pub raw_payload: serde_json::Value,
}
