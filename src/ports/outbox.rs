use time::OffsetDateTime;

use crate::types::PendingMutation;

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Corrupt(String),
    UnknownRecord(u64),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "pending store i/o error: {err}"),
            StoreError::Corrupt(reason) => write!(f, "pending store is corrupt: {reason}"),
            StoreError::UnknownRecord(id) => write!(f, "no pending record with id {id}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err)
    }
}

/// The `messages` database: a `pending` collection keyed by an
/// auto-incrementing id, plus a `dead_letter` collection for records that
/// were given up on.
pub trait PendingStore: Send + Sync + 'static {
    fn add(
        &self,
        payload: serde_json::Value,
        created_at: OffsetDateTime,
    ) -> impl Future<Output = Result<PendingMutation, StoreError>> + Send;

    /// Every pending record in insertion order.
    fn pending(&self) -> impl Future<Output = Result<Vec<PendingMutation>, StoreError>> + Send;

    fn delete(&self, id: u64) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Bumps the attempt counter and returns the new value.
    fn record_failure(&self, id: u64) -> impl Future<Output = Result<u32, StoreError>> + Send;

    /// Moves a record from `pending` to `dead_letter`.
    fn dead_letter(&self, id: u64) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn dead_letters(&self)
    -> impl Future<Output = Result<Vec<PendingMutation>, StoreError>> + Send;
}
