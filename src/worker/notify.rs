use serde::Serialize;
use url::Url;

use super::Worker;
use crate::ports::{ClientError, Notifier, Platform, WindowClient, WindowClients};
use crate::types::{NotificationDefaults, NotificationIntent, PushPayload};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "window", rename_all = "snake_case")]
pub enum ClickOutcome {
    Focused(WindowClient),
    Opened(WindowClient),
}

#[derive(Debug)]
pub enum ClickError {
    NotShown(String),
    InvalidTarget(String),
    Clients(ClientError),
}

impl std::fmt::Display for ClickError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickError::NotShown(tag) => write!(f, "no notification with tag '{tag}' is shown"),
            ClickError::InvalidTarget(reason) => {
                write!(f, "notification target is not a valid url: {reason}")
            }
            ClickError::Clients(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ClickError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClickError::Clients(err) => Some(err),
            _ => None,
        }
    }
}

fn without_fragment(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

impl<P: Platform> Worker<P> {
    /// Handles a push event. Never fails: whatever arrives, something is
    /// shown.
    pub async fn push(&self, raw: Option<&[u8]>) -> NotificationIntent {
        let defaults = NotificationDefaults {
            title: self.config.notification_title.clone(),
            icon: self.config.fallback_icon.clone(),
        };
        let intent = PushPayload::decode(raw).into_intent(&defaults);
        self.notifier.show(intent.clone()).await;
        intent
    }

    /// Handles a click on the notification shown under `tag`: dismisses
    /// it, then focuses a window already at its target or opens one.
    pub async fn notification_click(&self, tag: &str) -> Result<ClickOutcome, ClickError> {
        let intent = self
            .notifier
            .close(tag)
            .await
            .ok_or_else(|| ClickError::NotShown(tag.to_string()))?;
        let target = self
            .config
            .resolve(intent.target_url())
            .map_err(|err| ClickError::InvalidTarget(err.to_string()))?;
        let wanted = without_fragment(&target);

        let windows = self.clients.match_all(true).await;
        if let Some(window) = windows
            .iter()
            .find(|window| without_fragment(&window.url) == wanted)
        {
            let focused = self
                .clients
                .focus(window.id)
                .await
                .map_err(ClickError::Clients)?;
            tracing::debug!(id = focused.id, url = %focused.url, "focused existing window");
            return Ok(ClickOutcome::Focused(focused));
        }

        let opened = self
            .clients
            .open_window(target)
            .await
            .map_err(ClickError::Clients)?;
        Ok(ClickOutcome::Opened(opened))
    }
}
