use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::Method;
use time::OffsetDateTime;
use tokio::sync::Notify;
use time::format_description::well_known::Rfc3339;
use url::Url;

use crate::adapters::{ClientRegistry, NotificationTray};
use crate::cache::MemoryCacheStorage;
use crate::config::WorkerConfig;
use crate::outbox::MemoryPendingStore;
use crate::ports::{self, NetworkError, Platform};
use crate::types::{WorkerRequest, WorkerResponse};
use crate::worker::{Worker, WorkerParts};

pub(crate) const ORIGIN: &str = "http://upstream.test/";

pub(crate) fn create_temp_dir(test_name: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time")
        .as_nanos();
    dir.push(format!("offline-shell-{}-{}", test_name, nanos));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

pub(crate) fn fixed_now() -> OffsetDateTime {
    OffsetDateTime::parse("2025-03-04T10:15:00Z", &Rfc3339).expect("parse now")
}

pub(crate) fn origin_url(path: &str) -> Url {
    Url::parse(ORIGIN)
        .and_then(|origin| origin.join(path))
        .expect("origin url")
}

/// Clock frozen at [`fixed_now`]. Sleeps complete immediately, so any
/// timeout raced against a pending future fires on first poll, unless
/// [`FixedTime::stall_sleeps`] was called.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixedTime {
    stalled: Arc<AtomicBool>,
}

impl FixedTime {
    /// Makes every later sleep pend forever, so held requests never time out.
    pub(crate) fn stall_sleeps(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }
}

impl ports::TimeProvider for FixedTime {
    type Sleep<'a>
        = Pin<Box<dyn Future<Output = ()> + Send + 'a>>
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        fixed_now()
    }

    fn sleep<'a>(&'a self, _duration: Duration) -> Self::Sleep<'a> {
        if self.stalled.load(Ordering::SeqCst) {
            Box::pin(std::future::pending::<()>())
        } else {
            Box::pin(std::future::ready(()))
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) body: String,
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<String, WorkerResponse>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    held: HashMap<String, Arc<Notify>>,
    rejected_bodies: Vec<String>,
    offline: bool,
    calls: Vec<RecordedCall>,
}

/// Network double answering from a per-URL script. Unscripted URLs get 404.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedNetwork {
    script: Arc<Mutex<Script>>,
}

impl ScriptedNetwork {
    pub(crate) fn respond(&self, path: &str, response: WorkerResponse) {
        let mut script = self.script.lock().expect("script lock");
        let url = origin_url(path).to_string();
        script.failing.remove(&url);
        script.routes.insert(url, response);
    }

    pub(crate) fn fail(&self, path: &str) {
        let url = origin_url(path).to_string();
        self.script.lock().expect("script lock").failing.insert(url);
    }

    pub(crate) fn hang(&self, path: &str) {
        let url = origin_url(path).to_string();
        self.script.lock().expect("script lock").hanging.insert(url);
    }

    pub(crate) fn script_shell(&self, manifest: &[String]) {
        for path in manifest {
            let response = if path.ends_with(".png") {
                WorkerResponse::ok("image/png", format!("png:{path}"))
            } else if path.ends_with(".json") {
                WorkerResponse::ok("application/manifest+json", format!("manifest:{path}"))
            } else {
                WorkerResponse::ok("text/html", format!("<html>{path}</html>"))
            };
            self.respond(path, response);
        }
    }

    /// The next request to `path` waits until the returned gate is notified.
    pub(crate) fn hold_next(&self, path: &str) -> Arc<Notify> {
        let url = origin_url(path).to_string();
        let gate = Arc::new(Notify::new());
        self.script
            .lock()
            .expect("script lock")
            .held
            .insert(url, Arc::clone(&gate));
        gate
    }

    /// Answers 500 to any request whose body contains `needle`.
    pub(crate) fn reject_bodies_containing(&self, needle: &str) {
        self.script
            .lock()
            .expect("script lock")
            .rejected_bodies
            .push(needle.to_string());
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.script.lock().expect("script lock").offline = offline;
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().expect("script lock").calls.clone()
    }

    pub(crate) fn call_count(&self, path: &str) -> usize {
        let url = origin_url(path).to_string();
        self.calls().iter().filter(|call| call.url == url).count()
    }

    fn gate(&self, request: &WorkerRequest) -> Option<Arc<Notify>> {
        let url = request.url.to_string();
        self.script.lock().expect("script lock").held.remove(&url)
    }

    fn answer(&self, request: &WorkerRequest) -> Option<Result<WorkerResponse, NetworkError>> {
        let mut script = self.script.lock().expect("script lock");
        let url = request.url.to_string();
        let body = String::from_utf8_lossy(&request.body).into_owned();
        script.calls.push(RecordedCall {
            method: request.method.clone(),
            url: url.clone(),
            body: body.clone(),
        });
        if script.hanging.contains(&url) {
            return None;
        }
        if script.offline || script.failing.contains(&url) {
            return Some(Err(NetworkError::Unreachable("scripted failure".to_string())));
        }
        if script
            .rejected_bodies
            .iter()
            .any(|needle| body.contains(needle.as_str()))
        {
            let mut response = WorkerResponse::ok("application/json", r#"{"error":"rejected"}"#);
            response.status = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
            return Some(Ok(response));
        }
        Some(Ok(script.routes.get(&url).cloned().unwrap_or_else(|| {
            let mut response = WorkerResponse::ok("text/plain", "not found");
            response.status = axum::http::StatusCode::NOT_FOUND;
            response
        })))
    }
}

impl ports::Network for ScriptedNetwork {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<WorkerResponse, NetworkError>> + Send + 'a>>
    where
        Self: 'a;

    fn fetch<'a>(&'a self, request: &'a WorkerRequest) -> Self::Fut<'a> {
        let gate = self.gate(request);
        let answer = self.answer(request);
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            match answer {
                Some(result) => result,
                None => std::future::pending().await,
            }
        })
    }
}

pub(crate) struct TestPlatform;

impl Platform for TestPlatform {
    type Network = ScriptedNetwork;
    type Caches = MemoryCacheStorage;
    type Outbox = MemoryPendingStore;
    type Notifier = NotificationTray;
    type Clients = ClientRegistry;
    type Time = FixedTime;
}

/// A worker over in-memory adapters plus handles to drive them.
pub(crate) struct Harness {
    pub(crate) worker: Arc<Worker<TestPlatform>>,
    pub(crate) network: ScriptedNetwork,
    pub(crate) caches: MemoryCacheStorage,
    pub(crate) outbox: MemoryPendingStore,
    pub(crate) notifier: NotificationTray,
    pub(crate) clients: ClientRegistry,
    pub(crate) time: FixedTime,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self::with_config(test_worker_config())
    }

    pub(crate) fn with_config(config: WorkerConfig) -> Self {
        let network = ScriptedNetwork::default();
        let caches = MemoryCacheStorage::new();
        let outbox = MemoryPendingStore::new();
        let notifier = NotificationTray::new();
        let clients = ClientRegistry::new();
        let time = FixedTime::default();
        let worker = Worker::new(
            config,
            WorkerParts {
                network: network.clone(),
                caches: caches.clone(),
                outbox: outbox.clone(),
                notifier: notifier.clone(),
                clients: clients.clone(),
                time: time.clone(),
            },
        );
        Self {
            worker: Arc::new(worker),
            network,
            caches,
            outbox,
            notifier,
            clients,
            time,
        }
    }

    /// Scripts every shell manifest entry with a distinct body.
    pub(crate) fn script_shell(&self) {
        self.network.script_shell(&self.worker.config().shell_manifest);
    }

    /// Installs and activates against a fully scripted shell.
    pub(crate) async fn activated() -> Self {
        let harness = Self::new();
        harness.script_shell();
        harness.worker.install().await.expect("install");
        harness.worker.activate().await.expect("activate");
        harness
    }
}

pub(crate) fn test_worker_config() -> WorkerConfig {
    WorkerConfig::new(Url::parse(ORIGIN).expect("origin"))
}
