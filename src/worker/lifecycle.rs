use axum::http::StatusCode;
use serde::Serialize;

use super::{Worker, WorkerState};
use crate::ports::{CacheError, CacheStorage, Network, NetworkError, Platform, WindowClients};
use crate::types::{WorkerRequest, WorkerResponse};

#[derive(Debug)]
pub enum InstallError {
    InvalidUrl { path: String, reason: String },
    Fetch { path: String, source: NetworkError },
    Status { path: String, status: StatusCode },
    Cache(CacheError),
}

impl std::fmt::Display for InstallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstallError::InvalidUrl { path, reason } => {
                write!(f, "shell entry '{path}' is not a valid url: {reason}")
            }
            InstallError::Fetch { path, source } => {
                write!(f, "failed to fetch shell entry '{path}': {source}")
            }
            InstallError::Status { path, status } => {
                write!(f, "shell entry '{path}' answered {status}")
            }
            InstallError::Cache(err) => write!(f, "failed to populate shell cache: {err}"),
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstallError::Fetch { source, .. } => Some(source),
            InstallError::Cache(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub enum ActivateError {
    NotInstalled(WorkerState),
    Cache(CacheError),
}

impl std::fmt::Display for ActivateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivateError::NotInstalled(state) => {
                write!(f, "cannot activate a worker in state {state:?}")
            }
            ActivateError::Cache(err) => write!(f, "failed to list cache partitions: {err}"),
        }
    }
}

impl std::error::Error for ActivateError {}

#[derive(Debug)]
pub enum StartError {
    Install(InstallError),
    Activate(ActivateError),
}

impl std::fmt::Display for StartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartError::Install(err) => write!(f, "{err}, and no complete shell is cached"),
            StartError::Activate(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for StartError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartError::Install(err) => Some(err),
            StartError::Activate(err) => Some(err),
        }
    }
}

/// How [`Worker::start`] got the shell it now serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartMode {
    Installed,
    Restored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub partition: String,
    pub cached: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl<P: Platform> Worker<P> {
    /// Populates the shell partition with every manifest entry, or with
    /// none of them. On failure the worker becomes redundant and whatever
    /// was active before stays in charge.
    pub async fn install(&self) -> Result<InstallReport, InstallError> {
        self.set_state(WorkerState::Installing);
        match self.populate_shell().await {
            Ok(report) => {
                {
                    let mut lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
                    lifecycle.state = WorkerState::Installed;
                    lifecycle.skip_waiting = true;
                }
                tracing::info!(
                    partition = %report.partition,
                    entries = report.cached.len(),
                    "worker installed"
                );
                Ok(report)
            }
            Err(err) => {
                self.set_state(WorkerState::Redundant);
                tracing::error!(error = %err, "worker install failed");
                Err(err)
            }
        }
    }

    /// Installs, or falls back to the shell a previous run of this version
    /// left in storage, then activates. Used at startup and whenever the
    /// origin becomes reachable while the worker is not in control.
    pub async fn start(&self) -> Result<StartMode, StartError> {
        let mode = match self.install().await {
            Ok(_) => StartMode::Installed,
            Err(err) => {
                if !self.restore().await {
                    return Err(StartError::Install(err));
                }
                StartMode::Restored
            }
        };
        self.activate().await.map_err(StartError::Activate)?;
        Ok(mode)
    }

    /// Marks the worker installed when the current shell partition already
    /// holds every manifest entry. The shell is only ever written whole, so
    /// a complete one means an earlier install of this version succeeded.
    pub async fn restore(&self) -> bool {
        {
            let lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
            if !matches!(
                lifecycle.state,
                WorkerState::Parsed | WorkerState::Redundant
            ) {
                return false;
            }
        }

        let shell = &self.config.cache_names.shell;
        let required = match self.manifest_requests() {
            Ok(requests) => requests,
            Err(err) => {
                tracing::warn!(error = %err, "cannot check cached shell");
                return false;
            }
        };
        let cached = match self.caches.entry_keys(shell).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(partition = %shell, error = %err, "cannot read cached shell");
                return false;
            }
        };
        let missing = required
            .iter()
            .filter(|(_, request)| !cached.contains(&request.cache_key()))
            .count();
        if missing > 0 {
            tracing::info!(partition = %shell, missing, "cached shell is incomplete");
            return false;
        }

        {
            let mut lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
            lifecycle.state = WorkerState::Installed;
            lifecycle.skip_waiting = true;
        }
        tracing::info!(partition = %shell, "worker restored from cached shell");
        true
    }

    fn manifest_requests(&self) -> Result<Vec<(String, WorkerRequest)>, InstallError> {
        self.config
            .shell_manifest
            .iter()
            .map(|path| {
                self.config
                    .resolve(path)
                    .map(|url| (path.clone(), WorkerRequest::get(url)))
                    .map_err(|err| InstallError::InvalidUrl {
                        path: path.clone(),
                        reason: err.to_string(),
                    })
            })
            .collect()
    }

    async fn populate_shell(&self) -> Result<InstallReport, InstallError> {
        let mut entries: Vec<(String, WorkerResponse)> =
            Vec::with_capacity(self.config.shell_manifest.len());
        for (path, request) in self.manifest_requests()? {
            let response =
                self.network
                    .fetch(&request)
                    .await
                    .map_err(|source| InstallError::Fetch {
                        path: path.clone(),
                        source,
                    })?;
            if !response.status.is_success() {
                return Err(InstallError::Status {
                    path: path.clone(),
                    status: response.status,
                });
            }
            entries.push((request.cache_key(), response));
        }

        let cached = entries.iter().map(|(key, _)| key.clone()).collect();
        let partition = self.config.cache_names.shell.clone();
        self.caches
            .put_all(&partition, entries)
            .await
            .map_err(InstallError::Cache)?;
        Ok(InstallReport { partition, cached })
    }

    /// Drops every partition that does not belong to this version, then
    /// takes control of all open windows. Deletions are independent: a
    /// failed one is logged and retried at the next activation.
    pub async fn activate(&self) -> Result<ActivationReport, ActivateError> {
        {
            let mut lifecycle = self.lifecycle.lock().expect("worker lifecycle lock");
            if lifecycle.state != WorkerState::Installed {
                return Err(ActivateError::NotInstalled(lifecycle.state));
            }
            lifecycle.state = WorkerState::Activating;
        }

        let names = match self.caches.keys().await {
            Ok(names) => names,
            Err(err) => {
                self.set_state(WorkerState::Installed);
                return Err(ActivateError::Cache(err));
            }
        };

        let mut report = ActivationReport::default();
        for name in names {
            if self.config.cache_names.is_current(&name) {
                continue;
            }
            match self.caches.delete(&name).await {
                Ok(_) => {
                    tracing::info!(partition = %name, "deleted stale cache partition");
                    report.deleted.push(name);
                }
                Err(err) => {
                    tracing::warn!(
                        partition = %name,
                        error = %err,
                        "failed to delete stale cache partition"
                    );
                    report.failed.push(name);
                }
            }
        }

        if let Err(err) = self.caches.open(&self.config.cache_names.runtime).await {
            tracing::warn!(
                partition = %self.config.cache_names.runtime,
                error = %err,
                "failed to create runtime cache partition"
            );
        }

        self.clients.claim().await;
        self.set_state(WorkerState::Activated);
        tracing::info!(
            shell = %self.config.cache_names.shell,
            runtime = %self.config.cache_names.runtime,
            "worker activated and controlling clients"
        );
        Ok(report)
    }
}
