use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisType;

/// Top-level configuration shared by the three services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TradeflowConfig {
    pub orchestrator: OrchestratorConfig,
    pub market_analyst: ServiceConfig,
    pub stock_trader: ServiceConfig,
}

impl Default for TradeflowConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            market_analyst: ServiceConfig::new("0.0.0.0:8081"),
            stock_trader: ServiceConfig::new("0.0.0.0:8082"),
        }
    }
}

/// Listen address of a collaborator service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceConfig {
    pub bind: String,
}

impl ServiceConfig {
    pub fn new(bind: impl Into<String>) -> Self {
        Self { bind: bind.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub bind: String,
    pub services: ServicesConfig,
    pub workflow: WorkflowConfig,
    pub store: StoreConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            services: ServicesConfig::default(),
            workflow: WorkflowConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

/// Where the collaborator services live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServicesConfig {
    pub market_analyst_url: String,
    pub stock_trader_url: String,
    /// HTTP client timeout for analyze / execute-trade calls.
    pub request_timeout_seconds: u64,
    /// HTTP client timeout for health probes.
    pub health_timeout_seconds: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            market_analyst_url: "http://127.0.0.1:8081".to_string(),
            stock_trader_url: "http://127.0.0.1:8082".to_string(),
            request_timeout_seconds: 60,
            health_timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkflowConfig {
    pub default_analysis_type: AnalysisType,
    /// Upper bound on any single upstream call made by the engine.
    pub upstream_timeout_seconds: u64,
    /// Signals below this confidence are downgraded to HOLD. None = no gate.
    pub min_confidence: Option<Decimal>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            default_analysis_type: AnalysisType::Technical,
            upstream_timeout_seconds: 60,
            min_confidence: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Path to the SQLite history file (sqlite backend only).
    pub sqlite_path: String,
    /// Maximum number of sessions kept in the moka hot cache.
    pub memory_max_capacity: u64,
    /// How long a session read stays in the hot cache.
    pub memory_ttl_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_path: "data/tradeflow.db".to_string(),
            memory_max_capacity: 10_000,
            memory_ttl_seconds: 60,
        }
    }
}
