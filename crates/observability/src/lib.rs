//! Tracing/logging setup shared by keystone binaries and tests.

/// Initialize process-wide logging from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    self::tracing::init_with(&ObservabilityConfig::from_env());
}

/// Environment-driven configuration.
pub mod config;

/// Tracing subscriber installation (filters, formatting).
pub mod tracing;

pub use config::{LogFormat, ObservabilityConfig};
pub use self::tracing::init_with;
