pub mod analyst;
pub mod error;
mod http;
pub mod policy;
pub mod router;
pub mod trader;
pub mod workflow;

pub mod test_support;

pub use analyst::{normalize_analysis, HttpMarketAnalyst, MarketAnalyst};
pub use error::AgentError;
pub use policy::DecisionPolicy;
pub use router::{NaturalLanguageRouter, ParsedQuery, StaticSymbolResolver, SymbolResolver};
pub use trader::{validate_order, HttpStockTrader, StockTrader};
pub use workflow::{normalize_symbol, WorkflowEngine};
