use crate::app::ErrorResponse;
use crate::ports::{PendingStore, Platform};
use crate::state::AppState;
use crate::types::PendingMutation;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct EnqueueRequest {
    pub(crate) payload: serde_json::Value,
}

fn store_failure(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    tracing::error!(error = %err, "pending store unavailable");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "Pending message store is unavailable.",
        }),
    )
}

/// The application side of the queue: pages park writes here when the
/// network refused them.
pub(crate) async fn outbox_enqueue<P: Platform>(
    State(state): State<AppState<P>>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<PendingMutation>), (StatusCode, Json<ErrorResponse>)> {
    let record = state
        .worker
        .enqueue(request.payload)
        .await
        .map_err(store_failure)?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub(crate) async fn outbox_list<P: Platform>(
    State(state): State<AppState<P>>,
) -> Result<Json<Vec<PendingMutation>>, (StatusCode, Json<ErrorResponse>)> {
    let pending = state
        .worker
        .outbox()
        .pending()
        .await
        .map_err(store_failure)?;
    Ok(Json(pending))
}

pub(crate) async fn outbox_dead_letters<P: Platform>(
    State(state): State<AppState<P>>,
) -> Result<Json<Vec<PendingMutation>>, (StatusCode, Json<ErrorResponse>)> {
    let dead = state
        .worker
        .outbox()
        .dead_letters()
        .await
        .map_err(store_failure)?;
    Ok(Json(dead))
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use crate::app::tests::{get_request, json_request, router, send};
    use crate::test_support::Harness;
    use axum::http::StatusCode;
    use serde_json::{Value as JsonValue, json};

    #[tokio::test]
    async fn outbox_enqueue__should_append_records_in_order() {
        // Given
        let harness = Harness::new();
        let app = router(&harness);

        // When
        let (first_status, _) = send(
            app.clone(),
            json_request("POST", "/__worker/outbox", json!({ "payload": {"text": "A"} })),
        )
        .await;
        send(
            app.clone(),
            json_request("POST", "/__worker/outbox", json!({ "payload": {"text": "B"} })),
        )
        .await;
        let (status, body) = send(app, get_request("/__worker/outbox")).await;

        // Then
        assert_eq!(first_status, StatusCode::CREATED);
        assert_eq!(status, StatusCode::OK);
        let json: JsonValue = serde_json::from_slice(&body).expect("json");
        let records = json.as_array().expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["id"], 1);
        assert_eq!(records[0]["payload"]["text"], "A");
        assert_eq!(records[0]["created_at"], "2025-03-04T10:15:00Z");
        assert_eq!(records[1]["id"], 2);
    }

    #[tokio::test]
    async fn outbox_enqueue__should_reject_missing_payload() {
        // Given
        let harness = Harness::new();

        // When
        let (status, _) = send(
            router(&harness),
            json_request("POST", "/__worker/outbox", json!({ "text": "A" })),
        )
        .await;

        // Then
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn outbox_dead_letters__should_start_empty() {
        // Given
        let harness = Harness::new();

        // When
        let (status, body) = send(router(&harness), get_request("/__worker/outbox/dead-letter")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"[]");
    }
}
