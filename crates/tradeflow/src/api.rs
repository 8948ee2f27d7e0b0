//! Error bodies and status mapping shared by the HTTP services.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::error;
use tradeflow_agents::AgentError;
use tradeflow_models::{ErrorKind, Session};

/// Body of every non-session error response.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal.as_str(), message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound.as_str(), message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest.as_str(), message)
    }
}

pub type ApiFailure = (StatusCode, Json<ApiError>);
pub type ApiResult<T> = Result<T, ApiFailure>;

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest | ErrorKind::UnparseableQuery => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::UpstreamError | ErrorKind::InvalidResponse => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn agent_failure(err: AgentError) -> ApiFailure {
    let kind = err.kind();
    if kind == ErrorKind::Internal {
        error!(error = %err, "Request failed");
    }
    (status_for(kind), Json(ApiError::new(kind.as_str(), err.to_string())))
}

pub fn bad_request(message: impl Into<String>) -> ApiFailure {
    (StatusCode::BAD_REQUEST, Json(ApiError::bad_request(message)))
}

pub fn internal(message: impl Into<String>) -> ApiFailure {
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiError::internal(message)))
}

pub fn json_rejection(rejection: JsonRejection) -> ApiFailure {
    bad_request(rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> ApiFailure {
    bad_request(rejection.body_text())
}

/// A session is always returned as the body; a FAILED one carries the status
/// of its error kind.
pub fn session_response(session: Session) -> (StatusCode, Json<Session>) {
    let status = session
        .error
        .as_ref()
        .map(|e| status_for(e.kind))
        .unwrap_or(StatusCode::OK);
    (status, Json(session))
}
