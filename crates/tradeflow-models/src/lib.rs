pub mod analysis;
pub mod config;
pub mod messages;
pub mod session;
pub mod trade;

pub use analysis::{AnalysisResult, AnalysisType, Signal};
pub use config::{
    OrchestratorConfig, ServiceConfig, ServicesConfig, StoreBackend, StoreConfig, TradeflowConfig,
    WorkflowConfig,
};
pub use messages::{
    AnalysisReport, AnalyzeRequest, ExecuteTradeRequest, HealthStatus, NaturalLanguageRequest,
    ServicesHealth, TradeConfirmation, WorkflowRequest,
};
pub use session::{
    session_id_for, Decision, ErrorKind, InvalidTransition, Session, SessionError, SessionStatus,
    StepKind, WorkflowParams, WorkflowStep,
};
pub use trade::{OutcomeStatus, TradeAction, TradeOutcome, TradeRecord};
