use crate::types::WorkerResponse;

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Corrupt { partition: String, reason: String },
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "cache storage i/o error: {err}"),
            CacheError::Corrupt { partition, reason } => {
                write!(f, "cache partition '{partition}' is corrupt: {reason}")
            }
        }
    }
}

impl std::error::Error for CacheError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Io(err) => Some(err),
            CacheError::Corrupt { .. } => None,
        }
    }
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err)
    }
}

/// Named partitions of request key to response snapshot. Writes to a single
/// key are atomic; concurrent writes to the same key resolve last-write-wins.
pub trait CacheStorage: Send + Sync + 'static {
    /// Creates the partition if it does not exist yet.
    fn open(&self, partition: &str) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Partition names, oldest first.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Returns whether a partition was removed.
    fn delete(&self, partition: &str) -> impl Future<Output = Result<bool, CacheError>> + Send;

    fn lookup(
        &self,
        partition: &str,
        key: &str,
    ) -> impl Future<Output = Result<Option<WorkerResponse>, CacheError>> + Send;

    /// Inserts or overwrites one entry, creating the partition on demand.
    fn put(
        &self,
        partition: &str,
        key: &str,
        response: WorkerResponse,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Inserts every entry or none of them.
    fn put_all(
        &self,
        partition: &str,
        entries: Vec<(String, WorkerResponse)>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Entry keys of a partition in insertion order; empty when absent.
    fn entry_keys(
        &self,
        partition: &str,
    ) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;
}
