use crate::ports::Platform;
use crate::worker::Worker;

use std::sync::Arc;

pub struct AppState<P: Platform> {
    pub worker: Arc<Worker<P>>,
    pub vapid_public_key: Option<String>,
}

impl<P: Platform> AppState<P> {
    pub fn new(worker: Arc<Worker<P>>) -> Self {
        Self {
            worker,
            vapid_public_key: None,
        }
    }
}

// Derived Clone would demand `P: Clone`.
impl<P: Platform> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            worker: Arc::clone(&self.worker),
            vapid_public_key: self.vapid_public_key.clone(),
        }
    }
}
