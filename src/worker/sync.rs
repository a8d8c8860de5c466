use super::Worker;
use crate::ports::{Network, PendingStore, Platform, StoreError, TimeProvider};
use crate::types::{PendingMutation, SyncOutcome, SyncReport, WorkerRequest};

#[derive(Debug)]
pub enum SyncError {
    Store(StoreError),
    InvalidEndpoint(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::Store(err) => write!(f, "failed to read pending messages: {err}"),
            SyncError::InvalidEndpoint(reason) => {
                write!(f, "messages endpoint is not a valid url: {reason}")
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::Store(err) => Some(err),
            SyncError::InvalidEndpoint(_) => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        SyncError::Store(err)
    }
}

impl<P: Platform> Worker<P> {
    /// Appends a write the page could not deliver. Replayed by the next
    /// sync event.
    pub async fn enqueue(&self, payload: serde_json::Value) -> Result<PendingMutation, StoreError> {
        let record = self.outbox.add(payload, self.time.now()).await?;
        tracing::debug!(id = record.id, "queued pending message");
        Ok(record)
    }

    /// Handles a background sync event. Only the configured tag drains the
    /// queue; records are replayed oldest first and a failure never stops
    /// the ones after it.
    pub async fn sync(&self, tag: &str) -> Result<SyncOutcome, SyncError> {
        if tag != self.config.sync_tag {
            tracing::debug!(tag, "ignoring sync event with unknown tag");
            return Ok(SyncOutcome::Ignored {
                tag: tag.to_string(),
            });
        }

        let _drain = self.sync_lock.lock().await;
        let endpoint = self
            .config
            .resolve(&self.config.messages_endpoint)
            .map_err(|err| SyncError::InvalidEndpoint(err.to_string()))?;
        let pending = self.outbox.pending().await?;

        let mut report = SyncReport::default();
        for record in pending {
            let request = WorkerRequest::post_json(endpoint.clone(), &record.payload);
            let acknowledged = match self.fetch_with_timeout(&request).await {
                Ok(response) if response.status.is_success() => true,
                Ok(response) => {
                    tracing::warn!(id = record.id, status = %response.status, "replay rejected");
                    false
                }
                Err(err) => {
                    tracing::warn!(id = record.id, error = %err, "replay failed");
                    false
                }
            };

            if acknowledged {
                if let Err(err) = self.outbox.delete(record.id).await {
                    tracing::warn!(
                        id = record.id,
                        error = %err,
                        "replayed message could not be removed and will be sent again"
                    );
                }
                report.replayed.push(record.id);
                continue;
            }

            self.note_failed_replay(record.id, &mut report).await;
        }

        tracing::info!(
            replayed = report.replayed.len(),
            failed = report.failed.len(),
            dead_lettered = report.dead_lettered.len(),
            "sync drain finished"
        );
        Ok(SyncOutcome::Drained(report))
    }

    async fn note_failed_replay(&self, id: u64, report: &mut SyncReport) {
        let attempts = match self.outbox.record_failure(id).await {
            Ok(attempts) => attempts,
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to record replay attempt");
                report.failed.push(id);
                return;
            }
        };

        let limit = self.config.max_replay_attempts;
        if limit == 0 || attempts < limit {
            report.failed.push(id);
            return;
        }
        match self.outbox.dead_letter(id).await {
            Ok(()) => {
                tracing::warn!(id, attempts, "giving up on pending message");
                report.dead_lettered.push(id);
            }
            Err(err) => {
                tracing::warn!(id, error = %err, "failed to move message to dead letter");
                report.failed.push(id);
            }
        }
    }
}
