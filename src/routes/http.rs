// Handlers for the device (update, get_command) and the dashboard (data, history, reset).

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use super::{ApiError, AppState};
use crate::models::{HistorySeries, Snapshot, SnapshotUpdate};

/// Package name (from Cargo.toml).
const NAME: &str = env!("CARGO_PKG_NAME");
/// Package version (from Cargo.toml).
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Serialize)]
pub(super) struct StatusBody {
    status: &'static str,
    message: &'static str,
}

impl StatusBody {
    fn success(message: &'static str) -> Self {
        Self {
            status: "success",
            message,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct HistoryQuery {
    limit: Option<u32>,
}

/// GET /: the dashboard is served elsewhere.
pub(super) async fn index_handler() -> &'static str {
    "Occupancy relay is running. Dashboard data: GET /data, GET /history"
}

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /update: partial update. The body is fully parsed before anything is mutated.
pub(super) async fn update_handler(
    State(state): State<AppState>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<StatusBody>, ApiError> {
    let Json(value) = payload?;
    let update = SnapshotUpdate::from_json(value)?;
    state.sync.update(update).await;
    Ok(Json(StatusBody::success("Data updated")))
}

/// GET /data: current counters.
pub(super) async fn data_handler(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.sync.status())
}

/// GET /history: `{labels, values}` oldest first; `error` is set if the store failed.
pub(super) async fn history_handler(
    State(state): State<AppState>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistorySeries>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.sync.history(query.limit).await))
}

/// POST /reset: queue a reset for the device. Idempotent while pending.
pub(super) async fn reset_handler(State(state): State<AppState>) -> Json<StatusBody> {
    state.sync.request_reset();
    Json(StatusBody::success("Reset command sent"))
}

/// GET /get_command: bare "0" (reset, consumed by this read) or "1" (idle).
pub(super) async fn get_command_handler(State(state): State<AppState>) -> &'static str {
    state.sync.poll_command().as_str()
}
