//! Server-side push tooling: key generation and sending a test message to
//! one subscription, so the worker's push handling can be exercised end to
//! end from the command line.

use crate::adapters::WebPushSender;
use crate::config;
use crate::ports::PushSender;
use crate::types::PushPayload;
use crate::types::push::Subscription;

mod vapid;

pub use vapid::{
    PRIVATE_KEY_ENV, PUBLIC_KEY_ENV, SUBJECT_ENV, VapidConfigStatus, VapidCredentials,
    load_vapid_config,
};

#[derive(Debug)]
pub enum PushError {
    NotConfigured,
    Incomplete(Vec<&'static str>),
    InvalidKeys(String),
    Client(web_push::WebPushError),
    Encode(serde_json::Error),
    Delivery(String),
}

impl std::fmt::Display for PushError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushError::NotConfigured => f.write_str("VAPID keys are not configured"),
            PushError::Incomplete(missing) => {
                write!(f, "incomplete VAPID configuration, missing {}", missing.join(", "))
            }
            PushError::InvalidKeys(reason) => write!(f, "invalid VAPID configuration: {reason}"),
            PushError::Client(err) => write!(f, "failed to init web-push: {err}"),
            PushError::Encode(err) => write!(f, "failed to encode push payload: {err}"),
            PushError::Delivery(err) => write!(f, "push delivery failed: {err}"),
        }
    }
}

impl std::error::Error for PushError {}

pub async fn send_push(
    config: &config::AppConfig,
    subscription: &Subscription,
    payload: &PushPayload,
) -> Result<(), PushError> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete(missing) => return Err(PushError::Incomplete(missing)),
        VapidConfigStatus::Invalid(reason) => return Err(PushError::InvalidKeys(reason)),
        VapidConfigStatus::Missing => return Err(PushError::NotConfigured),
    };
    let sender = WebPushSender::new(vapid).map_err(PushError::Client)?;
    send_push_with_sender(&sender, subscription, payload).await
}

async fn send_push_with_sender<S: PushSender>(
    sender: &S,
    subscription: &Subscription,
    payload: &PushPayload,
) -> Result<(), PushError> {
    let body = serde_json::to_vec(payload).map_err(PushError::Encode)?;
    sender
        .send(subscription, &body)
        .await
        .map_err(|err| PushError::Delivery(err.to_string()))?;
    tracing::info!(endpoint = %subscription.endpoint, bytes = body.len(), "push sent");
    Ok(())
}
