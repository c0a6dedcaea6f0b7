//! Diagnostics error types

use moonbot_core::MoonbotError;
use thiserror::Error;

/// Errors from logging setup and host sensors
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// A global subscriber is already installed or the filter is malformed
    #[error("Logging initialization failed: {reason}")]
    LoggingInit {
        /// Failure reason
        reason: String,
    },

    /// A sensor or filesystem statistic could not be read
    #[error("Sensor {sensor} unreadable: {reason}")]
    SensorUnavailable {
        /// Sensor that failed
        sensor: String,
        /// Failure reason
        reason: String,
    },
}

/// Result type for diagnostics operations
pub type DiagnosticsResult<T> = Result<T, DiagnosticsError>;

impl From<DiagnosticsError> for MoonbotError {
    fn from(err: DiagnosticsError) -> Self {
        MoonbotError::Telemetry {
            reason: err.to_string(),
        }
    }
}
