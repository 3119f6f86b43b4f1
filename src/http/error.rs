use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::camera::CameraError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Errors a handler can answer with.
#[derive(Debug)]
pub enum ApiError {
    /// Any coordinator failure; the client gets a 400.
    Camera(CameraError),
    /// The server cannot keep going; it shuts down after answering.
    Fatal(String),
}

impl From<CameraError> for ApiError {
    fn from(error: CameraError) -> Self {
        ApiError::Camera(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Camera(error) => (StatusCode::BAD_REQUEST, error.to_string()),
            ApiError::Fatal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::GuardRejection;

    #[test]
    fn test_camera_errors_are_bad_request() {
        let response = ApiError::from(CameraError::from(GuardRejection::BusyCapturing)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_fatal_is_server_error() {
        let response = ApiError::Fatal("unable to read video output".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_envelope_shape() {
        let body = ErrorBody {
            error: "camera in use, recording video".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"error":"camera in use, recording video"}"#
        );
    }
}
