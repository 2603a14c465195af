use tracing_subscriber::{fmt, EnvFilter};

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// Later calls are no-ops, so tests and embedding hosts may both call it.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
