pub mod notification;
pub mod outbox;
pub mod push;
pub mod request;
pub mod response;

pub use notification::{NotificationDefaults, NotificationIntent, PushPayload};
pub use outbox::{PendingMutation, SyncOutcome, SyncReport};
pub use request::{RequestDestination, RequestMode, WorkerRequest};
pub use response::WorkerResponse;
