use crate::app::ErrorResponse;
use crate::ports::Platform;
use crate::state::AppState;
use crate::types::SyncOutcome;
use crate::worker::WorkerStatus;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

pub(crate) async fn worker_status<P: Platform>(
    State(state): State<AppState<P>>,
) -> Json<WorkerStatus> {
    Json(state.worker.status().await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncRequest {
    pub(crate) tag: Option<String>,
}

/// Delivers a sync event. `{}` uses the configured tag.
pub(crate) async fn worker_sync<P: Platform>(
    State(state): State<AppState<P>>,
    Json(request): Json<SyncRequest>,
) -> Result<Json<SyncOutcome>, (StatusCode, Json<ErrorResponse>)> {
    let tag = request
        .tag
        .unwrap_or_else(|| state.worker.config().sync_tag.clone());
    state.worker.sync(&tag).await.map(Json).map_err(|err| {
        tracing::error!(error = %err, "sync event failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Sync failed.",
            }),
        )
    })
}
