//! Dashboard API route handlers.
//!
//! All endpoints return JSON. Handlers read through the agent handle and
//! never touch loop internals.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::engine::control::AgentHandle;
use crate::types::{StatusSnapshot, TradeRecord};

pub type AppState = AgentHandle;

/// Most recent trades returned by `/api/trades`.
const TRADE_PAGE: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct ControlResponse {
    pub running: bool,
}

/// GET /api/status
pub async fn get_status(State(handle): State<AppState>) -> Json<StatusSnapshot> {
    Json(handle.status().await)
}

/// GET /api/trades
pub async fn get_trades(State(handle): State<AppState>) -> Json<Vec<TradeRecord>> {
    let trades = handle.trades().await;
    let start = trades.len().saturating_sub(TRADE_PAGE);
    Json(trades[start..].to_vec())
}

/// POST /api/start
pub async fn start(State(handle): State<AppState>) -> Json<ControlResponse> {
    handle.start();
    Json(ControlResponse {
        running: handle.is_running(),
    })
}

/// POST /api/stop
pub async fn stop(State(handle): State<AppState>) -> Json<ControlResponse> {
    handle.stop();
    Json(ControlResponse {
        running: handle.is_running(),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
