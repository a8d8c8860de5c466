use axum::http::Method;

use super::{FetchError, Worker};
use crate::ports::{CacheStorage, Network, NetworkError, Platform, TimeProvider};
use crate::types::{RequestDestination, WorkerRequest, WorkerResponse};

impl<P: Platform> Worker<P> {
    /// Network call bounded by the configured timeout. A request still in
    /// flight when the timer fires is dropped.
    pub(crate) async fn fetch_with_timeout(
        &self,
        request: &WorkerRequest,
    ) -> Result<WorkerResponse, NetworkError> {
        tokio::select! {
            biased;
            result = self.network.fetch(request) => result,
            _ = self.time.sleep(self.config.network_timeout) => Err(NetworkError::TimedOut),
        }
    }

    /// Stores a copy of `response` in `partition`. A failed write never
    /// affects the response already on its way to the page.
    async fn remember(&self, partition: &str, request: &WorkerRequest, response: &WorkerResponse) {
        if request.method != Method::GET || !response.is_cacheable() {
            return;
        }
        let key = request.cache_key();
        if let Err(err) = self.caches.put(partition, &key, response.clone()).await {
            tracing::warn!(partition, key = %key, error = %err, "failed to cache response");
        }
    }

    async fn lookup(&self, partition: &str, request: &WorkerRequest) -> Option<WorkerResponse> {
        match self.caches.lookup(partition, &request.cache_key()).await {
            Ok(found) => found,
            Err(err) => {
                tracing::warn!(partition, url = %request.url, error = %err, "cache lookup failed");
                None
            }
        }
    }

    /// API calls: fresh data when reachable, the last copy otherwise, and
    /// a synthetic 503 when neither exists.
    pub(super) async fn network_first(&self, request: &WorkerRequest) -> WorkerResponse {
        let runtime = &self.config.cache_names.runtime;
        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                self.remember(runtime, request, &response).await;
                response
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "api request failed, trying cache");
                match self.lookup(runtime, request).await {
                    Some(cached) => cached,
                    None => WorkerResponse::offline_error(),
                }
            }
        }
    }

    /// Page loads go to the network. Unreachable means the cached offline
    /// page, whatever URL was asked for.
    pub(super) async fn navigation(
        &self,
        request: &WorkerRequest,
    ) -> Result<WorkerResponse, FetchError> {
        let err = match self.fetch_with_timeout(request).await {
            Ok(response) => return Ok(response),
            Err(err) => err,
        };
        tracing::debug!(url = %request.url, error = %err, "navigation failed, serving offline page");
        let offline = self
            .config
            .resolve(&self.config.offline_page)
            .map_err(|_| FetchError::OfflinePageMissing)?;
        self.lookup(
            &self.config.cache_names.shell,
            &WorkerRequest::get(offline),
        )
        .await
        .ok_or(FetchError::OfflinePageMissing)
    }

    /// Static assets: any cached copy wins. Misses go to the network and
    /// successful answers are kept for next time.
    pub(super) async fn cache_first(
        &self,
        request: &WorkerRequest,
    ) -> Result<WorkerResponse, FetchError> {
        let names = &self.config.cache_names;
        if let Some(cached) = self.lookup(&names.runtime, request).await {
            return Ok(cached);
        }
        if let Some(cached) = self.lookup(&names.shell, request).await {
            return Ok(cached);
        }

        match self.fetch_with_timeout(request).await {
            Ok(response) => {
                self.remember(&names.runtime, request, &response).await;
                Ok(response)
            }
            Err(err) if request.destination == RequestDestination::Image => {
                let icon = match self.config.resolve(&self.config.fallback_icon) {
                    Ok(icon) => icon,
                    Err(_) => return Err(FetchError::Network(err)),
                };
                self.lookup(&names.shell, &WorkerRequest::get(icon))
                    .await
                    .ok_or(FetchError::Network(err))
            }
            Err(err) => Err(FetchError::Network(err)),
        }
    }
}
