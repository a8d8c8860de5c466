//! Stands in for the browser's "connectivity is back" signal: probes the
//! upstream origin and delivers a sync event whenever it becomes reachable
//! again. A worker that could not start is started first.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};

use crate::ports::{Platform, TimeProvider};
use crate::types::{SyncOutcome, WorkerRequest};
use crate::worker::Worker;

pub struct ConnectivityMonitor<P: Platform> {
    worker: Arc<Worker<P>>,
    online: bool,
}

impl<P: Platform> ConnectivityMonitor<P> {
    /// Starts out offline so the first successful probe drains anything
    /// queued before the front came up.
    pub fn new(worker: Arc<Worker<P>>) -> Self {
        Self {
            worker,
            online: false,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    /// Probes once. Returns the sync outcome when this probe found the
    /// origin reachable after it had not been.
    pub async fn probe_once(&mut self) -> Option<SyncOutcome> {
        let origin = self.worker.config().origin.clone();
        let probe = WorkerRequest::from_parts(Method::HEAD, origin, HeaderMap::new(), Bytes::new());
        let reachable = match self.worker.fetch_with_timeout(&probe).await {
            Ok(_) => true,
            Err(err) => {
                tracing::debug!(error = %err, "connectivity probe failed");
                false
            }
        };

        let came_back = reachable && !self.online;
        if self.online != reachable {
            tracing::info!(online = reachable, "connectivity changed");
        }
        self.online = reachable;
        if !came_back {
            return None;
        }

        if !self.worker.is_controlling() {
            match self.worker.start().await {
                Ok(mode) => tracing::info!(?mode, "worker started after reconnect"),
                Err(err) => tracing::warn!(error = %err, "worker still not started"),
            }
        }

        let tag = self.worker.config().sync_tag.clone();
        match self.worker.sync(&tag).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                tracing::warn!(error = %err, "sync after reconnect failed");
                None
            }
        }
    }

    pub async fn run(mut self, interval: Duration) {
        loop {
            self.probe_once().await;
            self.worker.time().sleep(interval).await;
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::PendingStore;
    use crate::test_support::Harness;
    use crate::types::WorkerResponse;
    use serde_json::json;

    #[tokio::test]
    async fn probe_once__should_sync_when_origin_comes_back() {
        // Given
        let harness = Harness::activated().await;
        harness.network.respond(
            "/api/messages",
            WorkerResponse::ok("application/json", "{}"),
        );
        harness.worker.enqueue(json!({"text": "A"})).await.expect("enqueue");
        let mut monitor = ConnectivityMonitor::new(harness.worker.clone());
        harness.network.set_offline(true);
        assert!(monitor.probe_once().await.is_none());

        // When
        harness.network.set_offline(false);
        let outcome = monitor.probe_once().await;

        // Then
        assert!(matches!(outcome, Some(SyncOutcome::Drained(ref report)) if report.replayed.len() == 1));
        assert!(monitor.is_online());
        assert!(harness.outbox.pending().await.expect("pending").is_empty());
    }

    #[tokio::test]
    async fn probe_once__should_not_sync_while_staying_online() {
        // Given
        let harness = Harness::activated().await;
        let mut monitor = ConnectivityMonitor::new(harness.worker.clone());
        monitor.probe_once().await;

        // When
        let outcome = monitor.probe_once().await;

        // Then
        assert!(outcome.is_none());
        assert_eq!(harness.network.call_count("/api/messages"), 0);
    }

    #[tokio::test]
    async fn probe_once__should_go_offline_on_failure() {
        // Given
        let harness = Harness::activated().await;
        let mut monitor = ConnectivityMonitor::new(harness.worker.clone());
        monitor.probe_once().await;
        harness.network.set_offline(true);

        // When
        monitor.probe_once().await;

        // Then
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn probe_once__should_start_a_worker_that_failed_to_install() {
        // Given
        let harness = Harness::new();
        harness.script_shell();
        harness.network.set_offline(true);
        assert!(harness.worker.start().await.is_err());
        let mut monitor = ConnectivityMonitor::new(harness.worker.clone());

        // When
        harness.network.set_offline(false);
        monitor.probe_once().await;

        // Then
        assert!(harness.worker.is_controlling());
        assert_eq!(
            harness
                .caches
                .entry_count(&harness.worker.config().cache_names.shell),
            6
        );
    }
}
