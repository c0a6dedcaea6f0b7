//! Structured logging setup

use crate::error::{DiagnosticsError, DiagnosticsResult};
use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber.
///
/// `level` is a filter directive such as `info` or `moonbot_server=debug`.
/// `RUST_LOG`, when set, takes precedence. Fails if a subscriber is already
/// installed.
pub fn init_logging(level: &str) -> DiagnosticsResult<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
        _ => EnvFilter::try_new(level),
    }
    .map_err(|e| DiagnosticsError::LoggingInit {
        reason: e.to_string(),
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| DiagnosticsError::LoggingInit {
            reason: e.to_string(),
        })
}
