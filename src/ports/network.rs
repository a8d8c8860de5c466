use crate::types::{WorkerRequest, WorkerResponse};

#[derive(Debug)]
pub enum NetworkError {
    Unreachable(String),
    TimedOut,
    InvalidRequest(String),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::Unreachable(reason) => write!(f, "network unreachable: {reason}"),
            NetworkError::TimedOut => f.write_str("network request timed out"),
            NetworkError::InvalidRequest(reason) => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for NetworkError {}

/// Performs a fetch. Any HTTP status counts as a response; only transport
/// failures are errors.
pub trait Network: Send + Sync + 'static {
    type Fut<'a>: Future<Output = Result<WorkerResponse, NetworkError>> + Send + 'a
    where
        Self: 'a;

    fn fetch<'a>(&'a self, request: &'a WorkerRequest) -> Self::Fut<'a>;
}
