use std::time::Duration;

use time::OffsetDateTime;

/// Clock seen by the worker. Stamps queued mutations and bounds network
/// attempts, so tests can freeze one and stall the other.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    /// Wall-clock time recorded as `created_at` on pending records.
    fn now(&self) -> OffsetDateTime;

    /// Resolves after `duration`; raced against fetches and probe ticks.
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
