use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::{AnalysisResult, AnalysisType};
use crate::trade::{TradeAction, TradeRecord};

/// Lifecycle of a workflow session.
///
/// `PENDING → ANALYZED → (EXECUTED | SKIPPED)`, or `→ FAILED` from either of
/// the first two states.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Pending,
    Analyzed,
    Executed,
    Skipped,
    Failed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Skipped | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Analyzed => "ANALYZED",
            Self::Executed => "EXECUTED",
            Self::Skipped => "SKIPPED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy shared by the engine, the store and the HTTP layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    UpstreamUnavailable,
    UpstreamError,
    InvalidResponse,
    NotFound,
    UnparseableQuery,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::UpstreamError => "upstream_error",
            Self::InvalidResponse => "invalid_response",
            Self::NotFound => "not_found",
            Self::UnparseableQuery => "unparseable_query",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure detail recorded on a FAILED session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Parameters of the workflow request that created the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowParams {
    pub quantity: u32,
    pub auto_execute: bool,
    pub analysis_type: AnalysisType,
}

/// Action chosen by the decision policy, with the reason for it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub action: TradeAction,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    WorkflowStarted,
    AnalysisRequested,
    AnalysisCompleted,
    TradeRequested,
    TradeCompleted,
    TradeSkipped,
    WorkflowFailed,
}

/// One entry of the session's audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub step: StepKind,
    pub at: DateTime<Utc>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("session {session_id}: cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub session_id: String,
    pub from: SessionStatus,
    pub to: SessionStatus,
}

/// Build the deterministic session id for a user, symbol and creation time.
pub fn session_id_for(user_id: &str, symbol: &str, created_at: DateTime<Utc>) -> String {
    format!("session-{user_id}-{symbol}-{}", created_at.timestamp())
}

/// One end-to-end workflow invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub symbol: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub params: Option<WorkflowParams>,
    pub analysis: Option<AnalysisResult>,
    pub decision: Option<Decision>,
    pub trade: Option<TradeRecord>,
    pub error: Option<SessionError>,
    pub steps: Vec<WorkflowStep>,
    pub summary: Option<String>,
}

impl Session {
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        symbol: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            symbol: symbol.into(),
            status: SessionStatus::Pending,
            created_at,
            updated_at: created_at,
            params: None,
            analysis: None,
            decision: None,
            trade: None,
            error: None,
            steps: Vec::new(),
            summary: None,
        }
    }

    pub fn record_step(&mut self, step: StepKind, detail: Option<String>) {
        let now = Utc::now();
        self.steps.push(WorkflowStep {
            step,
            at: now,
            detail,
        });
        self.updated_at = now;
    }

    pub fn mark_analyzed(&mut self, analysis: AnalysisResult) -> Result<(), InvalidTransition> {
        self.expect_status(&[SessionStatus::Pending], SessionStatus::Analyzed)?;
        let detail = format!("signal={} confidence={}", analysis.signal, analysis.confidence);
        self.analysis = Some(analysis);
        self.status = SessionStatus::Analyzed;
        self.record_step(StepKind::AnalysisCompleted, Some(detail));
        Ok(())
    }

    pub fn mark_skipped(&mut self, decision: Decision) -> Result<(), InvalidTransition> {
        self.expect_status(&[SessionStatus::Analyzed], SessionStatus::Skipped)?;
        let detail = decision.reason.clone();
        self.decision = Some(decision);
        self.status = SessionStatus::Skipped;
        self.record_step(StepKind::TradeSkipped, Some(detail));
        self.summarize();
        Ok(())
    }

    pub fn mark_executed(
        &mut self,
        decision: Decision,
        trade: TradeRecord,
    ) -> Result<(), InvalidTransition> {
        self.expect_status(&[SessionStatus::Analyzed], SessionStatus::Executed)?;
        // A trade can only follow an analysis.
        if self.analysis.is_none() {
            return Err(self.transition_error(SessionStatus::Executed));
        }
        let detail = format!("trade_id={} outcome={:?}", trade.trade_id, trade.outcome.status);
        self.decision = Some(decision);
        self.trade = Some(trade);
        self.status = SessionStatus::Executed;
        self.record_step(StepKind::TradeCompleted, Some(detail));
        self.summarize();
        Ok(())
    }

    pub fn mark_failed(&mut self, error: SessionError) -> Result<(), InvalidTransition> {
        self.expect_status(
            &[SessionStatus::Pending, SessionStatus::Analyzed],
            SessionStatus::Failed,
        )?;
        let detail = format!("{}: {}", error.kind, error.message);
        self.error = Some(error);
        self.status = SessionStatus::Failed;
        self.record_step(StepKind::WorkflowFailed, Some(detail));
        self.summarize();
        Ok(())
    }

    fn summarize(&mut self) {
        let action = self
            .decision
            .as_ref()
            .map(|d| d.action.as_str())
            .unwrap_or("no");
        self.summary = Some(format!(
            "Analyzed {}: {} recommendation. Status: {}",
            self.symbol, action, self.status
        ));
    }

    fn expect_status(
        &self,
        allowed: &[SessionStatus],
        to: SessionStatus,
    ) -> Result<(), InvalidTransition> {
        if allowed.contains(&self.status) {
            Ok(())
        } else {
            Err(self.transition_error(to))
        }
    }

    fn transition_error(&self, to: SessionStatus) -> InvalidTransition {
        InvalidTransition {
            session_id: self.session_id.clone(),
            from: self.status,
            to,
        }
    }
}
