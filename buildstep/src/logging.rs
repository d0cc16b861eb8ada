//! Tracing setup for the `buildstep` binary.
//!
//! Step notices and diagnostics go to stderr so that child output echoed on
//! stdout stays readable in CI logs.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset, which shows the per-step
/// "running"/"not needed" notices.
///
/// # Example
/// ```bash
/// RUST_LOG=buildstep=debug buildstep run
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
