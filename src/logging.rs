//! Logging init: structured events to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "warn,page_localizer=info";

/// Initialize logging to stderr. `quiet` lowers the default level so only
/// warnings and errors are shown unless `RUST_LOG` says otherwise.
pub fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { DEFAULT_FILTER };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
