//! The trading orchestrator: workflows, natural-language entry point and
//! per-user history.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tradeflow_agents::{NaturalLanguageRouter, StaticSymbolResolver, WorkflowEngine};
use tradeflow_models::{
    HealthStatus, NaturalLanguageRequest, ServicesHealth, Session, TradeRecord, WorkflowRequest,
};

use crate::api::{agent_failure, json_rejection, query_rejection, session_response, ApiResult};

pub struct OrchestratorState {
    pub engine: Arc<WorkflowEngine>,
    pub router: NaturalLanguageRouter,
}

impl OrchestratorState {
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        let router =
            NaturalLanguageRouter::new(Arc::new(StaticSymbolResolver), Arc::clone(&engine));
        Self { engine, router }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Trading Orchestrator",
        "status": "running",
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy", "agent": "orchestrator" }))
}

/// POST /trading-workflow
async fn trading_workflow(
    State(state): State<Arc<OrchestratorState>>,
    payload: Result<Json<WorkflowRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let Json(request) = payload.map_err(json_rejection)?;
    let session = state.engine.run(&request).await.map_err(agent_failure)?;
    Ok(session_response(session))
}

/// POST /natural-language-trading
async fn natural_language_trading(
    State(state): State<Arc<OrchestratorState>>,
    payload: Result<Json<NaturalLanguageRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Session>)> {
    let Json(request) = payload.map_err(json_rejection)?;
    let session = state
        .router
        .route_query(&request.query, &request.user_id)
        .await
        .map_err(agent_failure)?;
    Ok(session_response(session))
}

/// GET /sessions/{session_id}
async fn get_session(
    State(state): State<Arc<OrchestratorState>>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<Session>> {
    let session = state
        .engine
        .session(&session_id)
        .await
        .map_err(agent_failure)?;
    Ok(Json(session))
}

/// GET /users/{user_id}/sessions
async fn user_sessions(
    State(state): State<Arc<OrchestratorState>>,
    Path(user_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Session>>> {
    let Query(params) = params.map_err(query_rejection)?;
    let sessions = state
        .engine
        .sessions_for(&user_id, params.limit)
        .await
        .map_err(agent_failure)?;
    Ok(Json(sessions))
}

/// GET /users/{user_id}/trades
async fn user_trades(
    State(state): State<Arc<OrchestratorState>>,
    Path(user_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<TradeRecord>>> {
    let Query(params) = params.map_err(query_rejection)?;
    let trades = state
        .engine
        .trades_for(&user_id, params.limit)
        .await
        .map_err(agent_failure)?;
    Ok(Json(trades))
}

/// GET /services/health
async fn services_health(State(state): State<Arc<OrchestratorState>>) -> Json<ServicesHealth> {
    let (market_analyst, stock_trader) =
        tokio::join!(state.engine.analyst_health(), state.engine.trader_health());

    Json(ServicesHealth {
        orchestrator: HealthStatus::Healthy,
        market_analyst,
        stock_trader,
        store_backend: state.engine.store().backend().to_string(),
        timestamp: Utc::now(),
    })
}

pub fn router(state: Arc<OrchestratorState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/trading-workflow", post(trading_workflow))
        .route("/natural-language-trading", post(natural_language_trading))
        .route("/sessions/{session_id}", get(get_session))
        .route("/users/{user_id}/sessions", get(user_sessions))
        .route("/users/{user_id}/trades", get(user_trades))
        .route("/services/health", get(services_health))
        .with_state(state)
}
