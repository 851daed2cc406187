//! Logging setup

use tracing_subscriber::EnvFilter;

/// Initialize tracing output for applications that have no subscriber of
/// their own. Honors `RUST_LOG`; defaults to info for this crate. Safe to
/// call more than once.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("glessink=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
