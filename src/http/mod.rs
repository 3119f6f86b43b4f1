//! HTTP surface: maps the three camera endpoints (plus a status probe) onto
//! the coordinator and serializes results and errors.

pub mod error;
pub mod handlers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::camera::CameraCoordinator;

/// Stops the server, remembering whether it was a fatal condition.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    token: CancellationToken,
    fatal: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.token.cancel();
    }

    pub fn trigger_fatal(&self) {
        self.fatal.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}

#[derive(Clone)]
pub struct AppState {
    pub camera: Arc<CameraCoordinator>,
    pub shutdown: ShutdownSignal,
}

impl AppState {
    pub fn new(camera: Arc<CameraCoordinator>) -> Self {
        Self {
            camera,
            shutdown: ShutdownSignal::new(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pic.jpg", get(handlers::picture))
        .route("/video/start", post(handlers::start_recording))
        .route("/video/stop", get(handlers::stop_recording))
        .route("/status", get(handlers::status))
        .with_state(state)
}

/// Serves until the shutdown signal fires, then frees the camera.
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    let shutdown = state.shutdown.clone();
    let camera = Arc::clone(&state.camera);

    if let Ok(addr) = listener.local_addr() {
        tracing::info!(target: "http", "[HTTP] Listening on {}", addr);
    }

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await;

    camera.shutdown().await;
    tracing::info!(target: "http", "[HTTP] Server stopped");

    result
}
