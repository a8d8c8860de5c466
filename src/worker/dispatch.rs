use serde::Serialize;

use super::Worker;
use crate::config::WorkerConfig;
use crate::ports::{Network, NetworkError, Platform};
use crate::types::{WorkerRequest, WorkerResponse};

/// Schemes owned by browser extensions. Requests on them are never touched.
const EXTENSION_SCHEMES: &[&str] = &[
    "chrome-extension",
    "moz-extension",
    "safari-extension",
    "safari-web-extension",
    "ms-browser-extension",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Ignore,
    NetworkFirst,
    Navigation,
    CacheFirst,
}

impl Route {
    /// First match wins: extension schemes, then the API prefix, then
    /// top-level navigations, then everything else.
    pub fn classify(config: &WorkerConfig, request: &WorkerRequest) -> Self {
        if EXTENSION_SCHEMES.contains(&request.url.scheme()) {
            Route::Ignore
        } else if request.url.path().starts_with(&config.api_prefix) {
            Route::NetworkFirst
        } else if request.is_navigation() {
            Route::Navigation
        } else {
            Route::CacheFirst
        }
    }
}

#[derive(Debug)]
pub enum FetchOutcome {
    Respond(WorkerResponse),
    /// Not intercepted: the host performs its default fetch.
    Passthrough,
}

#[derive(Debug)]
pub enum FetchError {
    Network(NetworkError),
    OfflinePageMissing,
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network(err) => write!(f, "{err}"),
            FetchError::OfflinePageMissing => {
                f.write_str("network unavailable and no offline page is cached")
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Network(err) => Some(err),
            FetchError::OfflinePageMissing => None,
        }
    }
}

impl<P: Platform> Worker<P> {
    /// Handles one fetch event.
    pub async fn fetch(&self, request: &WorkerRequest) -> Result<FetchOutcome, FetchError> {
        if !self.is_controlling() {
            return Ok(FetchOutcome::Passthrough);
        }
        let route = Route::classify(&self.config, request);
        tracing::trace!(url = %request.url, ?route, "dispatching fetch");
        let response = match route {
            Route::Ignore => return Ok(FetchOutcome::Passthrough),
            Route::NetworkFirst => self.network_first(request).await,
            Route::Navigation => self.navigation(request).await?,
            Route::CacheFirst => self.cache_first(request).await?,
        };
        Ok(FetchOutcome::Respond(response))
    }

    /// The host's default fetch for requests the worker leaves alone.
    pub async fn passthrough(&self, request: &WorkerRequest) -> Result<WorkerResponse, NetworkError> {
        self.network.fetch(request).await
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::test_support::{Harness, origin_url, test_worker_config};
    use url::Url;

    #[test]
    fn classify__should_ignore_extension_schemes_first() {
        // Given
        let config = test_worker_config();
        let request =
            WorkerRequest::navigate(Url::parse("chrome-extension://abcdef/api/x").expect("url"));

        // Then
        assert_eq!(Route::classify(&config, &request), Route::Ignore);
    }

    #[test]
    fn classify__should_prefer_api_prefix_over_navigation() {
        // Given
        let config = test_worker_config();
        let request = WorkerRequest::navigate(origin_url("/api/appointments"));

        // Then
        assert_eq!(Route::classify(&config, &request), Route::NetworkFirst);
    }

    #[test]
    fn classify__should_split_navigations_from_assets() {
        // Given
        let config = test_worker_config();

        // Then
        assert_eq!(
            Route::classify(&config, &WorkerRequest::navigate(origin_url("/dashboard"))),
            Route::Navigation
        );
        assert_eq!(
            Route::classify(&config, &WorkerRequest::get(origin_url("/assets/app.js"))),
            Route::CacheFirst
        );
        assert_eq!(
            Route::classify(&config, &WorkerRequest::get(origin_url("/apiary.png"))),
            Route::CacheFirst
        );
    }

    #[tokio::test]
    async fn fetch__should_pass_through_before_activation() {
        // Given
        let harness = Harness::new();

        // When
        let outcome = harness
            .worker
            .fetch(&WorkerRequest::get(origin_url("/assets/app.js")))
            .await
            .expect("fetch");

        // Then
        assert!(matches!(outcome, FetchOutcome::Passthrough));
        assert!(harness.network.calls().is_empty());
    }

    #[tokio::test]
    async fn fetch__should_pass_through_extension_requests() {
        // Given
        let harness = Harness::activated().await;
        let calls_before = harness.network.calls().len();
        let request =
            WorkerRequest::get(Url::parse("moz-extension://1234/content.js").expect("url"));

        // When
        let outcome = harness.worker.fetch(&request).await.expect("fetch");

        // Then
        assert!(matches!(outcome, FetchOutcome::Passthrough));
        assert_eq!(harness.network.calls().len(), calls_before);
    }

    #[tokio::test]
    async fn fetch__should_serve_offline_page_for_navigation_when_unreachable() {
        // Given
        let harness = Harness::activated().await;
        harness.network.set_offline(true);

        // When
        let outcome = harness
            .worker
            .fetch(&WorkerRequest::navigate(origin_url("/dashboard")))
            .await
            .expect("fetch");

        // Then
        let FetchOutcome::Respond(response) = outcome else {
            panic!("expected a response");
        };
        assert_eq!(response.body.as_ref(), b"<html>/offline.html</html>");
    }
}
