//! Error types for MoonBot

use thiserror::Error;

/// Main error type for MoonBot operations
#[derive(Error, Debug)]
pub enum MoonbotError {
    /// Camera could not be opened or read, even after one reopen
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable {
        /// Reason reported by the device
        reason: String,
    },

    /// Photo not found in the store
    #[error("File not found: {name}")]
    NotFound {
        /// Requested photo name
        name: String,
    },

    /// Rejected input value
    #[error("Invalid value for {field}: {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// Encoding operation failed
    #[error("Encoding failed: {reason}")]
    Encoding {
        /// Reason for failure
        reason: String,
    },

    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        /// Underlying error
        #[from]
        source: std::io::Error,
    },

    /// Invalid static configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// Server start failed
    #[error("Failed to start server on {address}: {source}")]
    ServerStartFailed {
        /// Address that failed to bind
        address: std::net::SocketAddr,
        /// Underlying error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Host telemetry could not be collected
    #[error("Telemetry error: {reason}")]
    Telemetry {
        /// Reason for failure
        reason: String,
    },
}

/// Result type alias for MoonBot operations
pub type MoonbotResult<T> = Result<T, MoonbotError>;

impl MoonbotError {
    /// Shorthand for a validation failure
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MoonbotError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            MoonbotError::CameraUnavailable { .. } => "CAMERA_UNAVAILABLE".to_string(),
            MoonbotError::NotFound { .. } => "NOT_FOUND".to_string(),
            MoonbotError::Validation { .. } => "VALIDATION_FAILED".to_string(),
            MoonbotError::Encoding { .. } => "ENCODING_FAILED".to_string(),
            MoonbotError::Io { .. } => "IO_ERROR".to_string(),
            MoonbotError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION".to_string(),
            MoonbotError::ServerStartFailed { .. } => "SERVER_START_FAILED".to_string(),
            MoonbotError::Telemetry { .. } => "TELEMETRY_ERROR".to_string(),
        }
    }

    /// Check if retrying the same operation later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            MoonbotError::CameraUnavailable { .. } => true,
            MoonbotError::Io { .. } => true,
            MoonbotError::Telemetry { .. } => true,
            MoonbotError::NotFound { .. } => false,
            MoonbotError::Validation { .. } => false,
            MoonbotError::Encoding { .. } => false,
            MoonbotError::InvalidConfiguration { .. } => false,
            MoonbotError::ServerStartFailed { .. } => false,
        }
    }
}
