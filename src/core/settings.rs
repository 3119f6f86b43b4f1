use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::{CommandRunner, CoordinatorConfig, ToolCommand};
use crate::shared::paths::get_settings_path;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerSettings {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default = "default_max_record_secs")]
    pub max_record_secs: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_log_to_file")]
    pub log_to_file: bool,
    #[serde(default = "default_still")]
    pub still: ToolCommand,
    #[serde(default = "default_video")]
    pub video: ToolCommand,
    #[serde(default = "default_transcoder")]
    pub transcoder: ToolCommand,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_record_secs() -> u64 {
    10
}

fn default_settle_delay_ms() -> u64 {
    20
}

fn default_log_to_file() -> bool {
    true
}

fn default_still() -> ToolCommand {
    ToolCommand::new("raspistill")
}

fn default_video() -> ToolCommand {
    ToolCommand::new("raspivid")
}

fn default_transcoder() -> ToolCommand {
    ToolCommand::new("MP4Box")
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            work_dir: default_work_dir(),
            max_record_secs: default_max_record_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            log_to_file: default_log_to_file(),
            still: default_still(),
            video: default_video(),
            transcoder: default_transcoder(),
        }
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid bind address {0:?}")]
    InvalidAddress(String),
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, SettingsError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| SettingsError::InvalidAddress(self.bind_address.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            work_dir: self.work_dir.clone(),
            max_record_duration: Duration::from_secs(self.max_record_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn runner(&self) -> CommandRunner {
        CommandRunner::new(
            self.still.clone(),
            self.video.clone(),
            self.transcoder.clone(),
        )
    }
}

/// Loads settings from `path`, or from the default location when `None`.
///
/// An explicit path must exist; a missing default file yields defaults.
pub fn load_settings(path: Option<&Path>) -> Result<ServerSettings, SettingsError> {
    match path {
        Some(path) => load_settings_from_file(path),
        None => {
            let path = get_settings_path();
            if !path.exists() {
                return Ok(ServerSettings::default());
            }
            load_settings_from_file(&path)
        }
    }
}

fn load_settings_from_file(path: &Path) -> Result<ServerSettings, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = serde_json::from_str(&contents)?;
    Ok(settings)
}

#[derive(Parser, Debug, Default)]
#[command(author, version, about = "HTTP server for a Raspberry Pi camera")]
pub struct Cli {
    /// Port to bind to
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Settings file (JSON)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Directory for the raw and transcoded video files
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}

impl Cli {
    /// Loads the settings file and applies command-line overrides on top.
    pub fn resolve_settings(&self) -> Result<ServerSettings, SettingsError> {
        let mut settings = load_settings(self.config.as_deref())?;

        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(ref work_dir) = self.work_dir {
            settings.work_dir = work_dir.clone();
        }

        Ok(settings)
    }
}
