pub mod cache;
pub mod clients;
pub mod network;
pub mod notifier;
pub mod outbox;
pub mod push;
pub mod time;

pub use cache::{CacheError, CacheStorage};
pub use clients::{ClientError, WindowClient, WindowClients};
pub use network::{Network, NetworkError};
pub use notifier::Notifier;
pub use outbox::{PendingStore, StoreError};
pub use push::PushSender;
pub use self::time::TimeProvider;

/// The set of host capabilities a worker runs against.
pub trait Platform: Send + Sync + 'static {
    type Network: Network;
    type Caches: CacheStorage;
    type Outbox: PendingStore;
    type Notifier: Notifier;
    type Clients: WindowClients;
    type Time: TimeProvider;
}
