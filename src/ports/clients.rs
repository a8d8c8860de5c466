use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowClient {
    pub id: u64,
    pub url: Url,
    pub focused: bool,
    pub controlled: bool,
}

#[derive(Debug)]
pub enum ClientError {
    NotFound(u64),
    OpenRejected(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::NotFound(id) => write!(f, "no window client with id {id}"),
            ClientError::OpenRejected(url) => write!(f, "refused to open window at {url}"),
        }
    }
}

impl std::error::Error for ClientError {}

/// Open application windows within the worker's scope.
pub trait WindowClients: Send + Sync + 'static {
    fn match_all(
        &self,
        include_uncontrolled: bool,
    ) -> impl Future<Output = Vec<WindowClient>> + Send;

    fn focus(&self, id: u64) -> impl Future<Output = Result<WindowClient, ClientError>> + Send;

    fn open_window(&self, url: Url)
    -> impl Future<Output = Result<WindowClient, ClientError>> + Send;

    /// Takes control of every open window.
    fn claim(&self) -> impl Future<Output = ()> + Send;

    /// Host bookkeeping: a page announced itself.
    fn register(&self, url: Url, controlled: bool) -> impl Future<Output = WindowClient> + Send;

    /// Host bookkeeping: a page went away. Returns whether it was known.
    fn forget(&self, id: u64) -> impl Future<Output = bool> + Send;
}
