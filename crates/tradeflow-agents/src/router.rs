//! Natural-language entry point.
//!
//! Free text is reduced to a symbol, a quantity, an analysis type and an
//! execution intent, then handed to the [`WorkflowEngine`].

use std::sync::Arc;

use tracing::info;
use tradeflow_models::{AnalysisType, Session};

use crate::error::AgentError;
use crate::workflow::WorkflowEngine;

/// Maps free text to a ticker.
pub trait SymbolResolver: Send + Sync {
    fn resolve(&self, query: &str) -> Option<String>;
}

const KNOWN_TICKERS: &[&str] = &[
    "AAPL", "GOOGL", "GOOG", "TSLA", "MSFT", "AMZN", "NVDA", "META", "NFLX",
];

const COMPANY_NAMES: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("tesla", "TSLA"),
    ("microsoft", "MSFT"),
    ("amazon", "AMZN"),
    ("nvidia", "NVDA"),
    ("meta", "META"),
    ("facebook", "META"),
    ("netflix", "NFLX"),
];

/// Upper-case words that look like tickers but aren't.
const STOPWORDS: &[&str] = &[
    "AN", "THE", "AND", "OR", "OF", "TO", "IN", "ON", "AT", "BY", "FOR", "IS", "IT", "ME", "MY",
    "DO", "BE", "US", "WE", "IF", "SO", "NOW", "BUY", "SELL", "HOLD", "SHARE", "STOCK", "TRADE",
    "ORDER", "WHAT", "HOW", "WHY", "OK", "USD", "CEO", "IPO", "ETF", "AI", "PLEASE",
];

const FUNDAMENTAL_KEYWORDS: &[&str] = &["fundamental", "valuation", "earnings"];
const SENTIMENT_KEYWORDS: &[&str] = &["sentiment", "news"];
/// Word sequences that ask for the order to be placed.
const EXECUTE_PHRASES: &[&[&str]] = &[
    &["execute"],
    &["place", "an", "order"],
    &["place", "the", "order"],
    &["place", "order"],
    &["go", "ahead"],
];

/// Words that cancel an execute phrase later in the same clause.
const NEGATIONS: &[&str] = &[
    "not", "no", "never", "without", "don't", "dont", "didn't", "doesn't", "won't",
    "wouldn't", "shouldn't", "can't", "cannot",
];

const SHARE_WORDS: &[&str] = &["share", "shares"];

/// Lower-case words of one clause, keeping apostrophes inside contractions.
fn words(clause: &str) -> Vec<String> {
    clause
        .split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '’'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase().replace('’', "'"))
        .collect()
}

/// True only when some clause contains a whole-word execute phrase with no
/// negation before it in that clause.
fn requests_execution(query: &str) -> bool {
    query
        .split(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'))
        .any(|clause| {
            let words = words(clause);
            (0..words.len()).any(|i| {
                EXECUTE_PHRASES.iter().any(|phrase| {
                    words.len() - i >= phrase.len()
                        && words[i..].iter().zip(phrase.iter()).all(|(w, p)| w == p)
                }) && !words[..i].iter().any(|w| NEGATIONS.contains(&w.as_str()))
            })
        })
}

/// The integer right before `share`/`shares`, else 1.
fn share_quantity(query: &str) -> i64 {
    let tokens: Vec<&str> = query.split_whitespace().map(clean).collect();
    tokens
        .windows(2)
        .find_map(|pair| {
            let next = pair[1].to_ascii_lowercase();
            if SHARE_WORDS.contains(&next.as_str()) {
                pair[0].replace(',', "").parse::<i64>().ok()
            } else {
                None
            }
        })
        .unwrap_or(1)
}

fn clean(token: &str) -> &str {
    let token = token.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '$');
    token
        .strip_suffix("'s")
        .or_else(|| token.strip_suffix("’s"))
        .unwrap_or(token)
        .trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// Table-driven resolver: `$TICKER`, known tickers, company names, then
/// bare upper-case tokens of 2 to 5 letters.
#[derive(Debug, Default, Clone)]
pub struct StaticSymbolResolver;

impl SymbolResolver for StaticSymbolResolver {
    fn resolve(&self, query: &str) -> Option<String> {
        let tokens: Vec<&str> = query.split_whitespace().map(clean).collect();

        let dollar = tokens.iter().find_map(|t| {
            let ticker = t.strip_prefix('$')?;
            (!ticker.is_empty() && ticker.chars().all(|c| c.is_ascii_alphabetic()))
                .then(|| ticker.to_ascii_uppercase())
        });
        if dollar.is_some() {
            return dollar;
        }

        let known = tokens.iter().find_map(|t| {
            let upper = t.to_ascii_uppercase();
            KNOWN_TICKERS.contains(&upper.as_str()).then_some(upper)
        });
        if known.is_some() {
            return known;
        }

        let company = tokens.iter().find_map(|t| {
            let lower = t.to_ascii_lowercase();
            COMPANY_NAMES
                .iter()
                .find(|(name, _)| *name == lower)
                .map(|(_, ticker)| ticker.to_string())
        });
        if company.is_some() {
            return company;
        }

        tokens
            .iter()
            .find(|t| {
                (2..=5).contains(&t.len())
                    && t.chars().all(|c| c.is_ascii_uppercase())
                    && !STOPWORDS.contains(*t)
            })
            .map(|t| t.to_string())
    }
}

/// What a query asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub symbol: String,
    pub quantity: i64,
    pub analysis_type: AnalysisType,
    pub auto_execute: bool,
}

pub struct NaturalLanguageRouter {
    resolver: Arc<dyn SymbolResolver>,
    engine: Arc<WorkflowEngine>,
}

impl NaturalLanguageRouter {
    pub fn new(resolver: Arc<dyn SymbolResolver>, engine: Arc<WorkflowEngine>) -> Self {
        Self { resolver, engine }
    }

    pub fn parse(&self, query: &str) -> Result<ParsedQuery, AgentError> {
        let symbol = self.resolver.resolve(query).ok_or_else(|| {
            AgentError::UnparseableQuery(format!("no stock symbol found in {query:?}"))
        })?;

        let quantity = share_quantity(query);

        let lower = query.to_lowercase();
        let analysis_type = if FUNDAMENTAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
            AnalysisType::Fundamental
        } else if SENTIMENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            AnalysisType::Sentiment
        } else {
            AnalysisType::Technical
        };
        let auto_execute = requests_execution(query);

        Ok(ParsedQuery {
            symbol,
            quantity,
            analysis_type,
            auto_execute,
        })
    }

    pub async fn route_query(&self, query: &str, user_id: &str) -> Result<Session, AgentError> {
        let parsed = self.parse(query)?;
        info!(
            user_id = %user_id,
            symbol = %parsed.symbol,
            quantity = parsed.quantity,
            auto_execute = parsed.auto_execute,
            "Routing natural-language query"
        );
        self.engine
            .run_with(
                user_id,
                &parsed.symbol,
                parsed.quantity,
                parsed.auto_execute,
                parsed.analysis_type,
            )
            .await
    }
}
