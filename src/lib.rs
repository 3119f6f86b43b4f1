//! picam-server - exposes a single camera (stills and H.264 recording) over HTTP.
//!
//! The `camera` module holds the access coordinator; `http` maps endpoints onto
//! it; `core` carries settings and logging.

pub mod camera;
pub mod core;
pub mod http;
pub mod shared;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use crate::camera::CameraCoordinator;
use crate::core::settings::{Cli, ServerSettings, SettingsError};
use crate::http::AppState;
use crate::shared::paths::{ensure_dir, get_log_dir};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("Failed to prepare work directory: {0}")]
    WorkDir(#[source] std::io::Error),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let settings = match cli.resolve_settings() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("picam-server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log_dir = settings.log_to_file.then(get_log_dir);
    let _logging = crate::core::logging::init_logging(log_dir.as_deref());

    tracing::info!(target: "system", "Starting picam-server v{}", env!("CARGO_PKG_VERSION"));

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(StartupError::Runtime)
        .and_then(|runtime| runtime.block_on(serve(settings)));

    match result {
        Ok(ServerExit::Clean) => ExitCode::SUCCESS,
        Ok(ServerExit::Fatal) => {
            tracing::error!(target: "system", "Stopped after a fatal error");
            ExitCode::FAILURE
        }
        Err(e) => {
            tracing::error!(target: "system", "{}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerExit {
    Clean,
    Fatal,
}

/// Binds the configured address and serves until Ctrl-C or a fatal error.
pub async fn serve(settings: ServerSettings) -> Result<ServerExit, StartupError> {
    let addr = settings.socket_addr()?;
    ensure_dir(&settings.work_dir).map_err(StartupError::WorkDir)?;

    let camera = Arc::new(CameraCoordinator::new(
        Arc::new(settings.runner()),
        settings.coordinator_config(),
    ));
    let state = AppState::new(camera);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    tracing::info!(target: "system", "starting server on port :{}", settings.port);

    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!(target: "system", "Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                tracing::info!(target: "system", "Ctrl-C received, shutting down");
                shutdown.trigger();
            }
            _ = shutdown.wait() => {}
        }
    });

    let shutdown = state.shutdown.clone();
    crate::http::serve(listener, state).await.map_err(StartupError::Serve)?;

    Ok(if shutdown.is_fatal() {
        ServerExit::Fatal
    } else {
        ServerExit::Clean
    })
}
