//! Tracing initialisation for embedding applications and tests.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the caller's business. [`init_tracing`] is the one-liner most callers
//! want: formatted output on stderr, filtered by `RUST_LOG` with a fallback
//! level.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Install a stderr fmt subscriber honouring `RUST_LOG`.
///
/// `default_level` (e.g. `"info"`, `"mrio_algo=debug"`) applies when
/// `RUST_LOG` is unset or invalid. Repeated calls, and calls after another
/// global subscriber was installed, are no-ops.
pub fn init_tracing(default_level: &str) {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing("debug");
        init_tracing("info");
        tracing::info!(target: "mrio_core::logging", "tracing initialised twice without panicking");
    }
}
