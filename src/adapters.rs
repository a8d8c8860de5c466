use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::header::{CONTENT_LENGTH, HOST, HeaderName};
use time::OffsetDateTime;
use url::Url;

use crate::ports;
use crate::ports::{ClientError, NetworkError, WindowClient};
use crate::types::push::{Subscription, VapidConfig};
use crate::types::{NotificationIntent, WorkerRequest, WorkerResponse};

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimeProvider;

impl ports::TimeProvider for TokioTimeProvider {
    type Sleep<'a>
        = tokio::time::Sleep
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a> {
        tokio::time::sleep(duration)
    }
}

/// Fetches over HTTP. Redirects are handed back to the caller untouched so
/// the browser keeps seeing the real location.
#[derive(Debug, Clone)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
}

impl ReqwestNetwork {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

fn forwards_header(name: &HeaderName) -> bool {
    !matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    ) && *name != HOST
        && *name != CONTENT_LENGTH
}

impl ports::Network for ReqwestNetwork {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<WorkerResponse, NetworkError>> + Send + 'a>>
    where
        Self: 'a;

    fn fetch<'a>(&'a self, request: &'a WorkerRequest) -> Self::Fut<'a> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.clone(), request.url.clone());
            for (name, value) in request.headers.iter() {
                if forwards_header(name) {
                    builder = builder.header(name, value);
                }
            }
            if !request.body.is_empty() {
                builder = builder.body(request.body.clone());
            }

            let response = builder.send().await.map_err(classify_error)?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(classify_error)?;
            Ok(WorkerResponse::new(status, headers, body))
        })
    }
}

fn classify_error(err: reqwest::Error) -> NetworkError {
    if err.is_timeout() {
        NetworkError::TimedOut
    } else if err.is_builder() {
        NetworkError::InvalidRequest(err.to_string())
    } else {
        NetworkError::Unreachable(err.to_string())
    }
}

/// Notifications currently on screen, newest last.
#[derive(Debug, Clone, Default)]
pub struct NotificationTray {
    shown: Arc<Mutex<Vec<NotificationIntent>>>,
}

impl NotificationTray {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ports::Notifier for NotificationTray {
    async fn show(&self, intent: NotificationIntent) {
        tracing::info!(
            title = %intent.title,
            tag = %intent.tag,
            require_interaction = intent.require_interaction,
            "showing notification"
        );
        let mut shown = self.shown.lock().expect("notification tray lock");
        shown.retain(|existing| existing.tag != intent.tag);
        shown.push(intent);
    }

    async fn close(&self, tag: &str) -> Option<NotificationIntent> {
        let mut shown = self.shown.lock().expect("notification tray lock");
        let index = shown.iter().position(|intent| intent.tag == tag)?;
        Some(shown.remove(index))
    }

    async fn displayed(&self) -> Vec<NotificationIntent> {
        self.shown.lock().expect("notification tray lock").clone()
    }
}

/// Application windows known to the front. Pages register themselves; the
/// worker focuses or opens them on notification clicks.
#[derive(Debug, Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<Mutex<Windows>>,
}

#[derive(Debug, Default)]
struct Windows {
    next_id: u64,
    windows: Vec<WindowClient>,
}

impl Windows {
    fn insert(&mut self, url: Url, controlled: bool, focused: bool) -> WindowClient {
        self.next_id += 1;
        if focused {
            for window in &mut self.windows {
                window.focused = false;
            }
        }
        let window = WindowClient {
            id: self.next_id,
            url,
            focused,
            controlled,
        };
        self.windows.push(window.clone());
        window
    }
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ports::WindowClients for ClientRegistry {
    async fn match_all(&self, include_uncontrolled: bool) -> Vec<WindowClient> {
        self.inner
            .lock()
            .expect("client registry lock")
            .windows
            .iter()
            .filter(|window| include_uncontrolled || window.controlled)
            .cloned()
            .collect()
    }

    async fn focus(&self, id: u64) -> Result<WindowClient, ClientError> {
        let mut inner = self.inner.lock().expect("client registry lock");
        if !inner.windows.iter().any(|window| window.id == id) {
            return Err(ClientError::NotFound(id));
        }
        let mut focused = None;
        for window in &mut inner.windows {
            window.focused = window.id == id;
            if window.focused {
                focused = Some(window.clone());
            }
        }
        focused.ok_or(ClientError::NotFound(id))
    }

    async fn open_window(&self, url: Url) -> Result<WindowClient, ClientError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::OpenRejected(url.to_string()));
        }
        tracing::info!(url = %url, "opening window");
        Ok(self
            .inner
            .lock()
            .expect("client registry lock")
            .insert(url, true, true))
    }

    async fn claim(&self) {
        let mut inner = self.inner.lock().expect("client registry lock");
        for window in &mut inner.windows {
            window.controlled = true;
        }
    }

    async fn register(&self, url: Url, controlled: bool) -> WindowClient {
        self.inner
            .lock()
            .expect("client registry lock")
            .insert(url, controlled, false)
    }

    async fn forget(&self, id: u64) -> bool {
        let mut inner = self.inner.lock().expect("client registry lock");
        let before = inner.windows.len();
        inner.windows.retain(|window| window.id != id);
        inner.windows.len() != before
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }
}

impl ports::PushSender for WebPushSender {
    type Error = web_push::WebPushError;
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), Self::Error>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, payload: &'a [u8]) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.p256dh.clone(),
                subscription.auth.clone(),
            );
            let mut builder = web_push::WebPushMessageBuilder::new(&subscription_info)?;
            builder.set_payload(web_push::ContentEncoding::Aes128Gcm, payload);
            let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
                &self.vapid.private_key,
                web_push::URL_SAFE_NO_PAD,
                &subscription_info,
            )?;
            signature_builder.add_claim("sub", self.vapid.subject.as_str());
            builder.set_vapid_signature(signature_builder.build()?);
            self.client.send(builder.build()?).await?;
            Ok(())
        })
    }
}
