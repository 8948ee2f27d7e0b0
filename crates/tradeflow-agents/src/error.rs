use thiserror::Error;
use tradeflow_models::ErrorKind;
use tradeflow_store::StoreError;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: String, reason: String },

    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamError {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{service} sent an invalid response: {reason}")]
    InvalidResponse { service: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not understand query: {0}")]
    UnparseableQuery(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::UpstreamUnavailable { .. } => ErrorKind::UpstreamUnavailable,
            Self::UpstreamError { .. } => ErrorKind::UpstreamError,
            Self::InvalidResponse { .. } => ErrorKind::InvalidResponse,
            Self::NotFound(_) | Self::Store(StoreError::NotFound(_)) => ErrorKind::NotFound,
            Self::UnparseableQuery(_) => ErrorKind::UnparseableQuery,
            Self::Store(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn unavailable(service: &str, reason: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_response(service: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}
