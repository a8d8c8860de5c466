use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// An outbound write captured while offline, waiting to be replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingMutation {
    pub id: u64,
    pub payload: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub attempts: u32,
}

/// Result of draining the pending collection once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub replayed: Vec<u64>,
    pub failed: Vec<u64>,
    pub dead_lettered: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Ignored { tag: String },
    Drained(SyncReport),
}
