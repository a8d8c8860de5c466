pub mod adapters;
pub mod app;
pub mod cache;
pub mod config;
pub mod connectivity;
pub mod observability;
pub mod outbox;
pub mod ports;
pub mod push;
pub mod state;
mod storage;
#[cfg(test)]
pub(crate) mod test_support;
pub mod types;
pub mod worker;

use std::sync::Arc;

use adapters::{ClientRegistry, NotificationTray, ReqwestNetwork, TokioTimeProvider};
use cache::FsCacheStorage;
use connectivity::ConnectivityMonitor;
use outbox::FsPendingStore;
use ports::{CacheError, StoreError};
use worker::{Worker, WorkerParts};

pub use push::{PushError, VapidConfigStatus, VapidCredentials, load_vapid_config, send_push};

/// The adapters used when running as a real front.
pub struct LivePlatform;

impl ports::Platform for LivePlatform {
    type Network = ReqwestNetwork;
    type Caches = FsCacheStorage;
    type Outbox = FsPendingStore;
    type Notifier = NotificationTray;
    type Clients = ClientRegistry;
    type Time = TokioTimeProvider;
}

#[derive(Debug)]
pub enum ServeError {
    Network(reqwest::Error),
    Cache(CacheError),
    Store(StoreError),
    Bind(std::io::Error),
    Server(std::io::Error),
}

impl std::fmt::Display for ServeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServeError::Network(err) => write!(f, "failed to build http client: {err}"),
            ServeError::Cache(err) => write!(f, "failed to open cache storage: {err}"),
            ServeError::Store(err) => write!(f, "failed to open pending store: {err}"),
            ServeError::Bind(err) => write!(f, "failed to bind address: {err}"),
            ServeError::Server(err) => write!(f, "server error: {err}"),
        }
    }
}

impl std::error::Error for ServeError {}

/// Builds the live worker, starts it, then serves the front until the
/// process is stopped. When the origin is unreachable and no complete shell
/// is cached, the front runs as a plain proxy until the connectivity monitor
/// sees the origin again.
pub async fn serve(config: config::AppConfig) -> Result<(), ServeError> {
    let network = ReqwestNetwork::new(config.worker.network_timeout).map_err(ServeError::Network)?;
    let caches =
        FsCacheStorage::open_dir(config.data_dir.join("caches")).map_err(ServeError::Cache)?;
    let outbox = FsPendingStore::open_dir(&config.data_dir).map_err(ServeError::Store)?;
    let worker: Arc<Worker<LivePlatform>> = Arc::new(Worker::new(
        config.worker.clone(),
        WorkerParts {
            network,
            caches,
            outbox,
            notifier: NotificationTray::new(),
            clients: ClientRegistry::new(),
            time: TokioTimeProvider,
        },
    ));

    match worker.start().await {
        Ok(mode) => tracing::info!(?mode, "worker controlling clients"),
        Err(err) => tracing::warn!(error = %err, "serving without offline support for now"),
    }

    if let Some(interval) = config.probe_interval {
        let monitor = ConnectivityMonitor::new(Arc::clone(&worker));
        tokio::spawn(monitor.run(interval));
    }

    let mut state = state::AppState::new(worker);
    match load_vapid_config(&config) {
        VapidConfigStatus::Ready(vapid) => state.vapid_public_key = Some(vapid.public_key),
        VapidConfigStatus::Missing => {}
        VapidConfigStatus::Incomplete(missing) => {
            tracing::warn!(missing = ?missing, "push public key not served, VAPID settings incomplete");
        }
        VapidConfigStatus::Invalid(reason) => {
            tracing::warn!(%reason, "push public key not served");
        }
    }

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .map_err(ServeError::Bind)?;
    tracing::info!(
        listen = %config.listen,
        upstream = %config.worker.origin,
        "front listening"
    );
    axum::serve(listener, app::app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Server)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
