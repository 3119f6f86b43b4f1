//! Shared helpers for the HTTP integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use picam_lib::camera::{
    CameraCoordinator, CameraRunner, CoordinatorConfig, RecordExit, RunnerError,
};
use picam_lib::http::{self, AppState};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const PICTURE: &[u8] = b"\xff\xd8\xff\xe0fake-jpeg";
pub const RAW_VIDEO: &[u8] = b"\x00\x00\x00\x01fake-h264";

/// In-process stand-in for raspistill / raspivid / MP4Box.
#[derive(Default)]
pub struct ScriptedRunner {
    pub launch_fails: bool,
    /// Transcode reports success without producing a file.
    pub transcode_writes_nothing: bool,
}

#[async_trait]
impl CameraRunner for ScriptedRunner {
    async fn capture(&self) -> Result<Vec<u8>, RunnerError> {
        Ok(PICTURE.to_vec())
    }

    async fn record(
        &self,
        cancel: CancellationToken,
        output: PathBuf,
        _max_duration: Duration,
    ) -> Result<RecordExit, RunnerError> {
        if self.launch_fails {
            return Err(RunnerError::spawn(
                "raspivid",
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }

        tokio::fs::write(&output, RAW_VIDEO)
            .await
            .map_err(|e| RunnerError::wait("raspivid", e))?;
        cancel.cancelled().await;
        Ok(RecordExit::Cancelled)
    }

    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), RunnerError> {
        if self.transcode_writes_nothing {
            return Ok(());
        }
        tokio::fs::copy(input, output)
            .await
            .map(|_| ())
            .map_err(|e| RunnerError::wait("MP4Box", e))
    }
}

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub handle: JoinHandle<std::io::Result<()>>,
    pub client: reqwest::Client,
    _work_dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn spawn_server(runner: ScriptedRunner) -> TestServer {
    let work_dir = tempfile::tempdir().expect("temp work dir");
    let config = CoordinatorConfig {
        work_dir: work_dir.path().to_path_buf(),
        max_record_duration: Duration::from_secs(10),
        settle_delay: Duration::from_millis(5),
    };
    let camera = Arc::new(CameraCoordinator::new(Arc::new(runner), config));
    let state = AppState::new(camera);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(http::serve(listener, state.clone()));

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        handle,
        client: reqwest::Client::new(),
        _work_dir: work_dir,
    }
}

pub fn error_message(body: &str) -> String {
    let value: serde_json::Value = serde_json::from_str(body).expect("JSON error body");
    value["error"]
        .as_str()
        .expect("error field")
        .to_string()
}
