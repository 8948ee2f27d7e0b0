use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Self::Buy),
            "SELL" => Ok(Self::Sell),
            "HOLD" => Ok(Self::Hold),
            other => Err(format!("unknown trade action: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Accepted,
    Rejected,
}

/// Whether the trader took the order, and why not if it didn't.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeOutcome {
    pub status: OutcomeStatus,
    pub reason: Option<String>,
}

impl TradeOutcome {
    pub fn accepted(reason: Option<String>) -> Self {
        Self {
            status: OutcomeStatus::Accepted,
            reason,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            status: OutcomeStatus::Rejected,
            reason: Some(reason.into()),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status == OutcomeStatus::Accepted
    }
}

/// One executed or rejected order. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    pub trade_id: String,
    /// Back-reference to the session that produced this trade.
    pub session_id: String,
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: u32,
    pub price: Decimal,
    pub outcome: TradeOutcome,
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    /// Price times quantity, or `None` if that overflows.
    pub fn notional(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn action_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&TradeAction::Buy).unwrap(), "\"BUY\"");
        assert_eq!(serde_json::to_string(&TradeAction::Hold).unwrap(), "\"HOLD\"");
        assert_eq!("sell".parse::<TradeAction>().unwrap(), TradeAction::Sell);
        assert!("short".parse::<TradeAction>().is_err());
    }

    #[test]
    fn outcome_serialization() {
        let outcome = TradeOutcome::rejected("insufficient buying power");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "insufficient buying power");
        assert!(!outcome.is_accepted());
    }

    #[test]
    fn notional_value() {
        let trade = TradeRecord {
            trade_id: "t-1".to_string(),
            session_id: "session-u1-AAPL-1700000000".to_string(),
            symbol: "AAPL".to_string(),
            action: TradeAction::Buy,
            quantity: 100,
            price: dec!(150.25),
            outcome: TradeOutcome::accepted(None),
            executed_at: Utc::now(),
        };
        assert_eq!(trade.notional(), Some(dec!(15025.00)));

        let huge = TradeRecord {
            price: Decimal::MAX,
            quantity: 2,
            ..trade
        };
        assert_eq!(huge.notional(), None);
    }
}
