use crate::app::ErrorResponse;
use crate::ports::{Platform, WindowClient, WindowClients};
use crate::state::AppState;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;

pub(crate) async fn clients_list<P: Platform>(
    State(state): State<AppState<P>>,
) -> Json<Vec<WindowClient>> {
    Json(state.worker.clients().match_all(true).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    pub(crate) url: String,
}

/// A page announces itself. Relative URLs resolve against the origin.
pub(crate) async fn clients_register<P: Platform>(
    State(state): State<AppState<P>>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<WindowClient>), (StatusCode, Json<ErrorResponse>)> {
    let url = state.worker.config().resolve(&request.url).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Window URL is not valid.",
            }),
        )
    })?;
    let controlled = state.worker.is_controlling();
    let window = state.worker.clients().register(url, controlled).await;
    Ok((StatusCode::CREATED, Json(window)))
}

pub(crate) async fn clients_forget<P: Platform>(
    State(state): State<AppState<P>>,
    Path(id): Path<u64>,
) -> StatusCode {
    if state.worker.clients().forget(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use crate::app::tests::{get_request, json_request, router, send};
    use crate::test_support::Harness;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value as JsonValue, json};

    #[tokio::test]
    async fn clients_register__should_resolve_and_list_windows() {
        // Given
        let harness = Harness::activated().await;
        let app = router(&harness);

        // When
        let (status, body) = send(
            app.clone(),
            json_request("POST", "/__worker/clients", json!({ "url": "/dashboard" })),
        )
        .await;
        let (_, listed) = send(app, get_request("/__worker/clients")).await;

        // Then
        assert_eq!(status, StatusCode::CREATED);
        let window: JsonValue = serde_json::from_slice(&body).expect("json");
        assert_eq!(window["url"], "http://upstream.test/dashboard");
        assert_eq!(window["controlled"], true);
        let listed: JsonValue = serde_json::from_slice(&listed).expect("json");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn clients_forget__should_remove_known_windows_only() {
        // Given
        let harness = Harness::new();
        let app = router(&harness);
        send(
            app.clone(),
            json_request("POST", "/__worker/clients", json!({ "url": "/dashboard" })),
        )
        .await;
        let delete = |id: u64| {
            Request::builder()
                .method("DELETE")
                .uri(format!("/__worker/clients/{id}"))
                .body(Body::empty())
                .expect("build request")
        };

        // When
        let (removed, _) = send(app.clone(), delete(1)).await;
        let (missing, _) = send(app, delete(1)).await;

        // Then
        assert_eq!(removed, StatusCode::NO_CONTENT);
        assert_eq!(missing, StatusCode::NOT_FOUND);
    }
}
