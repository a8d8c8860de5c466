use crate::ports::Platform;
use crate::state::AppState;

use axum::Router;
use axum::routing::{delete, get, post};
use serde::Serialize;

mod clients;
mod control;
mod outbox;
mod proxy;
mod push;

/// The front: worker control endpoints under `/__worker/`, every other
/// request dispatched as a fetch event.
pub fn app<P: Platform>(state: AppState<P>) -> Router {
    Router::new()
        .route("/__worker/health", get(health))
        .route("/__worker/status", get(control::worker_status::<P>))
        .route("/__worker/sync", post(control::worker_sync::<P>))
        .route(
            "/__worker/outbox",
            get(outbox::outbox_list::<P>).post(outbox::outbox_enqueue::<P>),
        )
        .route(
            "/__worker/outbox/dead-letter",
            get(outbox::outbox_dead_letters::<P>),
        )
        .route("/__worker/push", post(push::push_deliver::<P>))
        .route("/__worker/push/public-key", get(push::push_public_key::<P>))
        .route(
            "/__worker/notifications",
            get(push::notifications_list::<P>),
        )
        .route(
            "/__worker/notifications/click",
            post(push::notification_click::<P>),
        )
        .route(
            "/__worker/clients",
            get(clients::clients_list::<P>).post(clients::clients_register::<P>),
        )
        .route("/__worker/clients/{id}", delete(clients::clients_forget::<P>))
        .fallback(proxy::proxy::<P>)
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[cfg(test)]
#[allow(non_snake_case)]
pub(crate) mod tests {
    use super::*;
    use crate::test_support::Harness;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::Value as JsonValue;
    use tower::ServiceExt;

    pub(crate) fn router(harness: &Harness) -> Router {
        app(AppState::new(harness.worker.clone()))
    }

    pub(crate) async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = router.oneshot(request).await.expect("request failed");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, body.to_vec())
    }

    pub(crate) fn json_request(method: &str, uri: &str, body: JsonValue) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request")
    }

    pub(crate) fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("build request")
    }

    #[tokio::test]
    async fn app__should_return_ok_on_health_endpoint() {
        // Given
        let harness = Harness::new();

        // When
        let (status, body) = send(router(&harness), get_request("/__worker/health")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn app__should_report_worker_status() {
        // Given
        let harness = Harness::activated().await;

        // When
        let (status, body) = send(router(&harness), get_request("/__worker/status")).await;

        // Then
        assert_eq!(status, StatusCode::OK);
        let json: JsonValue = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["state"], "activated");
        assert_eq!(json["shell"], "abu-abbad-shell-v1");
        let shell = json["partitions"]
            .as_array()
            .expect("partitions")
            .iter()
            .find(|partition| partition["name"] == "abu-abbad-shell-v1")
            .cloned()
            .expect("shell partition");
        assert_eq!(shell["entries"], 6);
    }
}
