//! HTTP error responses
//!
//! Every failed request answers with `{status: "error", message, code}`.
//! Missing photos map to 404, rejected input to 400, and everything else
//! (camera, encoding, disk) to 500.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use moonbot_core::MoonbotError;
use moonbot_media::MediaError;
use serde_json::json;
use tracing::{debug, error};

/// Error returned by request handlers
#[derive(Debug)]
pub struct ApiError(pub MoonbotError);

/// Result type for request handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MoonbotError::NotFound { .. } => StatusCode::NOT_FOUND,
            MoonbotError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match &self.0 {
            MoonbotError::NotFound { .. } => "File not found".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MoonbotError> for ApiError {
    fn from(err: MoonbotError) -> Self {
        Self(err)
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(MoonbotError::validation("body", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = %self.0.error_code(), error = %self.0, "Request failed");
        } else {
            debug!(code = %self.0.error_code(), error = %self.0, "Request rejected");
        }

        let body = json!({
            "status": "error",
            "message": self.message(),
            "code": self.0.error_code(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let not_found = ApiError(MoonbotError::NotFound {
            name: "x.jpg".to_string(),
        });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.message(), "File not found");

        let invalid = ApiError(MoonbotError::validation("stream_quality", "out of range"));
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let camera = ApiError::from(MediaError::CameraUnavailable {
            reason: "unplugged".to_string(),
        });
        assert_eq!(camera.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
