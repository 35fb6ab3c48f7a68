//! JSON log output via `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// Initialize JSON logging. `RUST_LOG` wins over `default_filter` when set;
/// an unparsable `default_filter` falls back to `info`.
///
/// Returns false if a global subscriber was already installed.
pub fn init_with(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init()
        .is_ok()
}
