//! Log output for the front and the worker it hosts.
//!
//! Verbosity follows `RUST_LOG` and defaults to `info`. Initialization is
//! guarded by `OnceLock` so repeated calls are harmless.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

pub fn init_tracing() {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init();
    });
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing__should_be_idempotent() {
        // When
        init_tracing();
        init_tracing();

        // Then
        assert!(TRACING_INIT.get().is_some());
    }
}
