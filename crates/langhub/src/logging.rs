//! Tracing subscriber setup for hosts that do not install their own.

use tracing_subscriber::EnvFilter;

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Installs a global fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Output goes to stderr; stdout often carries the editor protocol. Fails if a
/// global subscriber is already set.
pub fn init() -> Result<(), InitError> {
    init_with_default("info")
}

/// Like [`init`], with a custom fallback filter when `RUST_LOG` is unset.
pub fn init_with_default(directives: &str) -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives)),
        )
        .with_writer(std::io::stderr)
        .try_init()
}
