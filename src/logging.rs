//! Tracing setup for the binary.

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `TELEDROP_LOG=debug`.
pub const LOG_ENV: &str = "TELEDROP_LOG";

const DEFAULT_FILTER: &str = "warn";

static INIT: OnceLock<()> = OnceLock::new();

/// Install a stderr fmt subscriber filtered by `TELEDROP_LOG`.
///
/// Safe to call more than once; only the first call does anything. Never
/// fails: if another subscriber is already installed it is left alone.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    });
}
