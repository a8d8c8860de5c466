use crate::app::ErrorResponse;
use crate::ports::Platform;
use crate::state::AppState;
use crate::types::WorkerRequest;
use crate::worker::{FetchError, FetchOutcome};

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

fn bad_gateway(error: &'static str) -> Response {
    (StatusCode::BAD_GATEWAY, Json(ErrorResponse { error })).into_response()
}

/// Every request outside `/__worker/` becomes a fetch event against the
/// upstream origin.
pub(crate) async fn proxy<P: Platform>(
    State(state): State<AppState<P>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let origin = &state.worker.config().origin;
    let target = uri
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .unwrap_or("/");
    let url = match origin.join(target) {
        Ok(url) if url.origin() == origin.origin() => url,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Request does not target the application origin.",
                }),
            )
                .into_response();
        }
    };

    let request = WorkerRequest::from_parts(method, url, headers, body);
    match state.worker.fetch(&request).await {
        Ok(FetchOutcome::Respond(response)) => response.into_response(),
        Ok(FetchOutcome::Passthrough) => match state.worker.passthrough(&request).await {
            Ok(response) => response.into_response(),
            Err(err) => {
                tracing::warn!(url = %request.url, error = %err, "passthrough fetch failed");
                bad_gateway("Upstream is unreachable.")
            }
        },
        Err(err) => {
            tracing::warn!(url = %request.url, error = %err, "fetch failed");
            match err {
                FetchError::OfflinePageMissing => bad_gateway("Offline and no offline page is cached."),
                FetchError::Network(_) => bad_gateway("Upstream is unreachable."),
            }
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use crate::app::tests::{get_request, router, send};
    use crate::test_support::Harness;
    use crate::types::WorkerResponse;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value as JsonValue;

    fn navigate(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("sec-fetch-mode", "navigate")
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .expect("build request")
    }

    #[tokio::test]
    async fn proxy__should_serve_offline_page_for_navigation_when_offline() {
        // Given
        let harness = Harness::activated().await;
        harness.network.set_offline(true);

        // When
        let (status, body) = send(router(&harness), navigate("/dashboard")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"<html>/offline.html</html>");
    }

    #[tokio::test]
    async fn proxy__should_return_offline_json_for_api_calls() {
        // Given
        let harness = Harness::activated().await;
        harness.network.set_offline(true);

        // When
        let (status, body) = send(router(&harness), get_request("/api/appointments?day=1")).await;

        // Then
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let json: JsonValue = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["error"], "offline: no network connection");
    }

    #[tokio::test]
    async fn proxy__should_forward_before_activation() {
        // Given
        let harness = Harness::new();
        harness
            .network
            .respond("/assets/app.js", WorkerResponse::ok("text/javascript", "live"));

        // When
        let (status, body) = send(router(&harness), get_request("/assets/app.js")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"live");
        assert_eq!(harness.caches.entry_count("abu-abbad-runtime-v1"), 0);
    }

    #[tokio::test]
    async fn proxy__should_map_asset_failures_to_bad_gateway() {
        // Given
        let harness = Harness::activated().await;
        harness.network.set_offline(true);

        // When
        let (status, _) = send(router(&harness), get_request("/assets/app.css")).await;

        // Then
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn proxy__should_reject_foreign_authorities() {
        // Given
        let harness = Harness::activated().await;

        // When
        let (status, _) = send(router(&harness), get_request("//evil.test/steal")).await;

        // Then
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
