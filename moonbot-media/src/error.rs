//! Media error types and handling
//!
//! Errors raised by camera devices, the capture gateway and the frame encoder.

use moonbot_core::MoonbotError;
use thiserror::Error;

/// Main error type for camera and encoding operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Device could not be read even after one reopen
    #[error("Camera unavailable: {reason}")]
    CameraUnavailable {
        /// Last failure reported by the device
        reason: String,
    },

    /// Device open failed
    #[error("Failed to open camera {device}: {reason}")]
    DeviceOpenFailed {
        /// Device name
        device: String,
        /// Failure reason
        reason: String,
    },

    /// A single frame read failed
    #[error("Frame read failed on {device}: {reason}")]
    ReadFailed {
        /// Device name
        device: String,
        /// Failure reason
        reason: String,
    },

    /// A frame read did not complete in time
    #[error("Frame read timed out after {duration:?}")]
    ReadTimeout {
        /// How long the read was given
        duration: std::time::Duration,
    },

    /// Encoding operation failed
    #[error("Encoding failed: {codec} - {reason}")]
    EncodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// Frame buffer does not match its dimensions
    #[error("Invalid frame data: expected {expected} bytes, got {actual}")]
    InvalidFrameData {
        /// Expected data size
        expected: usize,
        /// Actual data size
        actual: usize,
    },

    /// Backend not compiled in or not supported here
    #[error("Unsupported platform: {platform}")]
    UnsupportedPlatform {
        /// Platform or backend name
        platform: String,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if the device may recover after a reopen
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::ReadFailed { .. } => true,
            MediaError::ReadTimeout { .. } => true,
            MediaError::DeviceOpenFailed { .. } => true,
            MediaError::CameraUnavailable { .. } => true,
            MediaError::EncodingFailed { .. } => false,
            MediaError::InvalidFrameData { .. } => false,
            MediaError::UnsupportedPlatform { .. } => false,
        }
    }
}

impl From<MediaError> for MoonbotError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::CameraUnavailable { reason } => MoonbotError::CameraUnavailable { reason },
            err @ (MediaError::DeviceOpenFailed { .. }
            | MediaError::ReadFailed { .. }
            | MediaError::ReadTimeout { .. }
            | MediaError::UnsupportedPlatform { .. }) => MoonbotError::CameraUnavailable {
                reason: err.to_string(),
            },
            err @ (MediaError::EncodingFailed { .. } | MediaError::InvalidFrameData { .. }) => {
                MoonbotError::Encoding {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = MediaError::InvalidFrameData {
            expected: 230_400,
            actual: 512,
        };
        assert_eq!(
            error.to_string(),
            "Invalid frame data: expected 230400 bytes, got 512"
        );
    }

    #[test]
    fn test_device_errors_become_camera_unavailable() {
        let err: MoonbotError = MediaError::ReadFailed {
            device: "video0".to_string(),
            reason: "EIO".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "CAMERA_UNAVAILABLE");

        let err: MoonbotError = MediaError::CameraUnavailable {
            reason: "unplugged".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Camera unavailable: unplugged");
    }

    #[test]
    fn test_encoding_errors_map_to_encoding() {
        let err: MoonbotError = MediaError::EncodingFailed {
            codec: "jpeg".to_string(),
            reason: "bad quality".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), "ENCODING_FAILED");
        assert!(!MediaError::InvalidFrameData {
            expected: 1,
            actual: 0
        }
        .is_recoverable());
    }
}
