//! Tracing subscriber setup for hosts

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a `fmt` subscriber. `RUST_LOG` wins over `verbose`.
///
/// Returns false when a global subscriber was already set.
pub fn init_logging(verbose: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .is_ok()
}
