pub mod market_analyst;
pub mod orchestrator;
pub mod stock_trader;
