use axum::body::{Body, Bytes};
use axum::http::header::{CONTENT_TYPE, HeaderMap};
use axum::http::{HeaderValue, StatusCode};
use serde::Serialize;

const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

pub(crate) const OFFLINE_ERROR_MESSAGE: &str = "offline: no network connection";

/// A fully buffered response. Cloning is cheap, so the same snapshot can be
/// handed to the caller and written to a cache partition.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Serialize)]
struct OfflineError {
    error: &'static str,
}

impl WorkerResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let mut response = Self {
            status,
            headers,
            body,
        };
        response.strip_hop_by_hop();
        response
    }

    pub fn ok(content_type: &'static str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            status: StatusCode::OK,
            headers,
            body: body.into(),
        }
    }

    /// The synthetic response handed to API callers when neither the
    /// network nor the runtime cache can answer.
    pub fn offline_error() -> Self {
        let body = serde_json::to_vec(&OfflineError {
            error: OFFLINE_ERROR_MESSAGE,
        })
        .unwrap_or_default();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            headers,
            body: Bytes::from(body),
        }
    }

    /// Success or redirect: anything else is an error body that must not be
    /// stored as if it were valid data.
    pub fn is_cacheable(&self) -> bool {
        self.status.is_success() || self.status.is_redirection()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    fn strip_hop_by_hop(&mut self) {
        for name in HOP_BY_HOP {
            self.headers.remove(*name);
        }
    }

    pub fn into_response(self) -> axum::response::Response {
        let mut response = axum::response::Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
