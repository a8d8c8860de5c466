use axum::body::Bytes;
use axum::http::header::{ACCEPT, HeaderMap};
use axum::http::{HeaderValue, Method};
use url::Url;

/// How the page issued the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

impl RequestMode {
    fn from_header(value: &str) -> Option<Self> {
        match value {
            "navigate" => Some(Self::Navigate),
            "same-origin" => Some(Self::SameOrigin),
            "cors" => Some(Self::Cors),
            "no-cors" => Some(Self::NoCors),
            _ => None,
        }
    }
}

/// What the response is going to be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDestination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    Empty,
    Other,
}

impl RequestDestination {
    fn from_header(value: &str) -> Self {
        match value {
            "document" | "iframe" | "frame" => Self::Document,
            "image" => Self::Image,
            "script" | "worker" | "sharedworker" => Self::Script,
            "style" => Self::Style,
            "font" => Self::Font,
            "manifest" => Self::Manifest,
            "empty" => Self::Empty,
            _ => Self::Other,
        }
    }

    fn from_path(path: &str) -> Self {
        let file_name = path.rsplit('/').next().unwrap_or_default();
        let Some((_, ext)) = file_name.rsplit_once('.') else {
            return Self::Empty;
        };
        match ext.to_ascii_lowercase().as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" | "avif" => Self::Image,
            "js" | "mjs" => Self::Script,
            "css" => Self::Style,
            "woff" | "woff2" | "ttf" | "otf" => Self::Font,
            "webmanifest" => Self::Manifest,
            _ => Self::Empty,
        }
    }
}

/// A fetch as seen by the worker: an absolute URL plus the navigation hints
/// needed to route it.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub mode: RequestMode,
    pub destination: RequestDestination,
}

impl WorkerRequest {
    pub fn get(url: Url) -> Self {
        let destination = RequestDestination::from_path(url.path());
        Self {
            method: Method::GET,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mode: RequestMode::NoCors,
            destination,
        }
    }

    pub fn navigate(url: Url) -> Self {
        Self {
            mode: RequestMode::Navigate,
            destination: RequestDestination::Document,
            ..Self::get(url)
        }
    }

    pub fn post_json(url: Url, payload: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/json"),
        );
        Self {
            method: Method::POST,
            url,
            headers,
            body: Bytes::from(payload.to_string()),
            mode: RequestMode::Cors,
            destination: RequestDestination::Empty,
        }
    }

    /// Builds a request from what arrived over the wire, reading the
    /// `Sec-Fetch-*` hints and falling back to `Accept` and the path
    /// extension when a client does not send them.
    pub fn from_parts(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        let header_str = |name: &str| headers.get(name).and_then(|value| value.to_str().ok());

        let mode = header_str("sec-fetch-mode")
            .and_then(RequestMode::from_header)
            .unwrap_or_else(|| {
                let wants_html = headers
                    .get(ACCEPT)
                    .and_then(|value| value.to_str().ok())
                    .is_some_and(|accept| accept.contains("text/html"));
                if method == Method::GET && wants_html {
                    RequestMode::Navigate
                } else {
                    RequestMode::NoCors
                }
            });

        let destination = match header_str("sec-fetch-dest") {
            Some(dest) => RequestDestination::from_header(dest),
            None if mode == RequestMode::Navigate => RequestDestination::Document,
            None => RequestDestination::from_path(url.path()),
        };

        Self {
            method,
            url,
            headers,
            body,
            mode,
            destination,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    /// Identity of the request inside a cache partition.
    pub fn cache_key(&self) -> String {
        let mut url = self.url.clone();
        url.set_fragment(None);
        format!("{} {}", self.method, url)
    }
}
