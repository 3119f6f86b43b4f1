use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::camera::CameraState;

pub async fn picture(State(state): State<AppState>) -> Result<Response, ApiError> {
    let picture = state.camera.capture().await.map_err(|e| {
        tracing::warn!(target: "http", "[HTTP] unable to capture picture: {}", e);
        ApiError::from(e)
    })?;

    Ok(([(header::CONTENT_TYPE, "image/jpeg")], picture).into_response())
}

pub async fn start_recording(State(state): State<AppState>) -> Result<(), ApiError> {
    state.camera.start_recording().await.map_err(|e| {
        tracing::warn!(target: "http", "[HTTP] unable to start recording: {}", e);
        ApiError::from(e)
    })
}

pub async fn stop_recording(State(state): State<AppState>) -> Result<Response, ApiError> {
    let filename = state.camera.stop_recording().await.map_err(|e| {
        tracing::warn!(target: "http", "[HTTP] unable to stop recording: {}", e);
        ApiError::from(e)
    })?;

    // A reported file that cannot be read back is fatal for the server.
    let video = match tokio::fs::read(&filename).await {
        Ok(video) => video,
        Err(e) => {
            tracing::error!(target: "http",
                "[HTTP] unable to read video output {:?}: {}", filename, e);
            state.shutdown.trigger_fatal();
            return Err(ApiError::Fatal(format!("unable to read video output: {}", e)));
        }
    };

    Ok(([(header::CONTENT_TYPE, "video/mp4")], video).into_response())
}

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub state: CameraState,
}

pub async fn status(State(state): State<AppState>) -> Json<StatusBody> {
    Json(StatusBody {
        state: state.camera.status(),
    })
}
