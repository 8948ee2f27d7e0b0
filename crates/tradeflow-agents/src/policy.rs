use rust_decimal::Decimal;
use tradeflow_models::{AnalysisResult, Decision, Signal, TradeAction};

/// Maps an analysis to a trade action.
#[derive(Debug, Clone, Default)]
pub struct DecisionPolicy {
    /// Signals reported with less confidence than this are treated as HOLD.
    pub min_confidence: Option<Decimal>,
}

impl DecisionPolicy {
    pub fn new(min_confidence: Option<Decimal>) -> Self {
        Self { min_confidence }
    }

    pub fn decide(&self, analysis: &AnalysisResult) -> Decision {
        let action = match analysis.signal {
            Signal::Bullish => TradeAction::Buy,
            Signal::Bearish => TradeAction::Sell,
            Signal::Neutral => TradeAction::Hold,
        };

        if action != TradeAction::Hold {
            if let Some(min) = self.min_confidence {
                if analysis.confidence < min {
                    return Decision {
                        action: TradeAction::Hold,
                        reason: format!(
                            "{} signal at confidence {} is below the {} threshold",
                            analysis.signal, analysis.confidence, min
                        ),
                    };
                }
            }
        }

        Decision {
            action,
            reason: format!(
                "{} signal at confidence {}",
                analysis.signal, analysis.confidence
            ),
        }
    }
}
