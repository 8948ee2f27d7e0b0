//! Tradeflow - a multi-agent trading workflow platform
//!
//! An orchestrator drives `analyze → decide → execute` workflows against a
//! market analyst and a stock trader, keeping every session and trade in a
//! session store. All three run as HTTP services from the same binary.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use tradeflow::models::{TradeflowConfig, WorkflowRequest};
//! use tradeflow::agents::{WorkflowEngine, HttpMarketAnalyst, HttpStockTrader};
//! use tradeflow::store::{MemorySessionStore, SessionStore};
//! ```

pub use tradeflow_agents as agents;
pub use tradeflow_models as models;
pub use tradeflow_store as store;

pub mod api;
pub mod server;
pub mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tradeflow_agents::{HttpMarketAnalyst, HttpStockTrader, WorkflowEngine};
use tradeflow_models::{OrchestratorConfig, StoreBackend, StoreConfig, TradeflowConfig};
use tradeflow_store::{MemorySessionStore, SessionStore, SqliteSessionStore};

use crate::services::orchestrator::OrchestratorState;

/// Read the TOML config, or fall back to defaults when the file is absent.
pub fn load_config(path: &str) -> anyhow::Result<TradeflowConfig> {
    if !Path::new(path).exists() {
        warn!(path, "Config file not found, using defaults");
        return Ok(TradeflowConfig::default());
    }
    let config_str =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {path}"))?;
    toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))
}

/// Build the session store selected by configuration.
pub fn build_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn SessionStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemorySessionStore::new())),
        StoreBackend::Sqlite => {
            if let Some(parent) = Path::new(&config.sqlite_path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create store directory: {}", parent.display())
                    })?;
                }
            }
            let store = SqliteSessionStore::open(&config.sqlite_path)
                .with_context(|| format!("Failed to open session DB: {}", config.sqlite_path))?
                .with_hot_cache(
                    config.memory_max_capacity,
                    Duration::from_secs(config.memory_ttl_seconds),
                );
            info!(path = %config.sqlite_path, "Opened SQLite session store");
            Ok(Arc::new(store))
        }
    }
}

/// Build the orchestrator state: HTTP clients for both collaborators, the
/// store, and the workflow engine on top.
pub fn build_orchestrator(config: &OrchestratorConfig) -> anyhow::Result<Arc<OrchestratorState>> {
    let request_timeout = Duration::from_secs(config.services.request_timeout_seconds);
    let health_timeout = Duration::from_secs(config.services.health_timeout_seconds);

    let analyst = HttpMarketAnalyst::new(
        &config.services.market_analyst_url,
        request_timeout,
        health_timeout,
    )
    .context("Failed to build market analyst client")?;
    let trader = HttpStockTrader::new(
        &config.services.stock_trader_url,
        request_timeout,
        health_timeout,
    )
    .context("Failed to build stock trader client")?;
    let store = build_store(&config.store)?;

    let engine = WorkflowEngine::new(Arc::new(analyst), Arc::new(trader), store, &config.workflow);
    Ok(Arc::new(OrchestratorState::new(Arc::new(engine))))
}

/// Replace the port of a `host:port` bind address.
pub fn override_port(bind: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => {
            let host = bind.rsplit_once(':').map(|(host, _)| host).unwrap_or(bind);
            format!("{host}:{port}")
        }
        None => bind.to_string(),
    }
}
