use crate::app::ErrorResponse;
use crate::ports::{Notifier, Platform};
use crate::state::AppState;
use crate::types::NotificationIntent;
use crate::worker::{ClickError, ClickOutcome};

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

/// Delivers a push event carrying the raw request body.
pub(crate) async fn push_deliver<P: Platform>(
    State(state): State<AppState<P>>,
    body: Bytes,
) -> Json<NotificationIntent> {
    let raw = (!body.is_empty()).then_some(body.as_ref());
    Json(state.worker.push(raw).await)
}

pub(crate) async fn notifications_list<P: Platform>(
    State(state): State<AppState<P>>,
) -> Json<Vec<NotificationIntent>> {
    Json(state.worker.notifier().displayed().await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ClickRequest {
    pub(crate) tag: String,
}

pub(crate) async fn notification_click<P: Platform>(
    State(state): State<AppState<P>>,
    Json(request): Json<ClickRequest>,
) -> Result<Json<ClickOutcome>, (StatusCode, Json<ErrorResponse>)> {
    match state.worker.notification_click(&request.tag).await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(ClickError::NotShown(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No notification with that tag is shown.",
            }),
        )),
        Err(err @ ClickError::InvalidTarget(_)) => {
            tracing::warn!(error = %err, "notification click rejected");
            Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Notification target is not a valid URL.",
                }),
            ))
        }
        Err(err @ ClickError::Clients(_)) => {
            tracing::error!(error = %err, "notification click failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Could not focus or open a window.",
                }),
            ))
        }
    }
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key<P: Platform>(
    State(state): State<AppState<P>>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.vapid_public_key {
        Some(public_key) => Ok(Json(PublicKeyResponse { public_key })),
        None => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Push notifications are not configured.",
            }),
        )),
    }
}
