//! The offline worker: one value per deployment version holding the host
//! adapters, with a named handler per platform event.
//!
//! | event              | handler                         |
//! |--------------------|---------------------------------|
//! | install            | [`Worker::install`]             |
//! | restart            | [`Worker::start`]               |
//! | activate           | [`Worker::activate`]            |
//! | fetch              | [`Worker::fetch`]               |
//! | sync               | [`Worker::sync`]                |
//! | push               | [`Worker::push`]                |
//! | notification click | [`Worker::notification_click`]  |
//!
//! Handlers only suspend on network and storage calls, so any number of
//! fetch events may be in flight at once. Sync drains are serialized.

mod dispatch;
mod lifecycle;
mod notify;
mod strategy;
mod sync;

use std::sync::Mutex;

use serde::Serialize;

use crate::config::WorkerConfig;
use crate::ports::{CacheStorage, Platform};

pub use dispatch::{FetchError, FetchOutcome, Route};
pub use lifecycle::{
    ActivateError, ActivationReport, InstallError, InstallReport, StartError, StartMode,
};
pub use notify::{ClickError, ClickOutcome};
pub use sync::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug)]
struct Lifecycle {
    state: WorkerState,
    skip_waiting: bool,
}

/// Host adapters handed to [`Worker::new`].
pub struct WorkerParts<P: Platform> {
    pub network: P::Network,
    pub caches: P::Caches,
    pub outbox: P::Outbox,
    pub notifier: P::Notifier,
    pub clients: P::Clients,
    pub time: P::Time,
}

pub struct Worker<P: Platform> {
    config: WorkerConfig,
    network: P::Network,
    caches: P::Caches,
    outbox: P::Outbox,
    notifier: P::Notifier,
    clients: P::Clients,
    time: P::Time,
    lifecycle: Mutex<Lifecycle>,
    sync_lock: tokio::sync::Mutex<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: usize,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub skip_waiting: bool,
    pub shell: String,
    pub runtime: String,
    pub partitions: Vec<PartitionStatus>,
}

impl<P: Platform> Worker<P> {
    pub fn new(config: WorkerConfig, parts: WorkerParts<P>) -> Self {
        Self {
            config,
            network: parts.network,
            caches: parts.caches,
            outbox: parts.outbox,
            notifier: parts.notifier,
            clients: parts.clients,
            time: parts.time,
            lifecycle: Mutex::new(Lifecycle {
                state: WorkerState::Parsed,
                skip_waiting: false,
            }),
            sync_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn network(&self) -> &P::Network {
        &self.network
    }

    pub fn caches(&self) -> &P::Caches {
        &self.caches
    }

    pub fn outbox(&self) -> &P::Outbox {
        &self.outbox
    }

    pub fn notifier(&self) -> &P::Notifier {
        &self.notifier
    }

    pub fn clients(&self) -> &P::Clients {
        &self.clients
    }

    pub fn time(&self) -> &P::Time {
        &self.time
    }

    pub fn state(&self) -> WorkerState {
        self.lifecycle.lock().expect("worker lifecycle lock").state
    }

    /// Whether pages are served by this worker. Before that, fetches are
    /// left alone.
    pub fn is_controlling(&self) -> bool {
        self.state() == WorkerState::Activated
    }

    fn set_state(&self, state: WorkerState) {
        let mut lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
        tracing::debug!(from = ?lifecycle.state, to = ?state, "worker state change");
        lifecycle.state = state;
    }

    pub async fn status(&self) -> WorkerStatus {
        let (state, skip_waiting) = {
            let lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
            (lifecycle.state, lifecycle.skip_waiting)
        };
        let names = match self.caches.keys().await {
            Ok(names) => names,
            Err(err) => {
                tracing::warn!(error = %err, "failed to list cache partitions");
                Vec::new()
            }
        };
        let mut partitions = Vec::with_capacity(names.len());
        for name in names {
            let entries = self
                .caches
                .entry_keys(&name)
                .await
                .map(|keys| keys.len())
                .unwrap_or(0);
            partitions.push(PartitionStatus {
                current: self.config.cache_names.is_current(&name),
                name,
                entries,
            });
        }
        WorkerStatus {
            state,
            skip_waiting,
            shell: self.config.cache_names.shell.clone(),
            runtime: self.config.cache_names.runtime.clone(),
            partitions,
        }
    }
}
