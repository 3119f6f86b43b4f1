use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::shared::paths::ensure_dir;

/// Targets that get their own daily log file; everything else lands in system.log.
const FILE_TARGETS: [&str; 2] = ["camera", "http"];

/// Keeps the non-blocking file writers alive. Dropping it flushes them.
pub struct LoggingGuards {
    _guards: Vec<WorkerGuard>,
}

/// Routes each event to the file for its target.
struct TargetWriter {
    writers: Vec<(&'static str, NonBlocking)>,
    system_writer: NonBlocking,
}

impl TargetWriter {
    fn writer_for(&self, target: &str) -> &NonBlocking {
        self.writers
            .iter()
            .find(|(name, _)| target == *name || target.starts_with(&format!("{}::", name)))
            .map(|(_, writer)| writer)
            .unwrap_or(&self.system_writer)
    }
}

impl<'a> MakeWriter<'a> for TargetWriter {
    type Writer = NonBlocking;

    fn make_writer(&'a self) -> Self::Writer {
        self.system_writer.clone()
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        self.writer_for(meta.target()).clone()
    }
}

fn file_writer(log_dir: &Path, guards: &mut Vec<WorkerGuard>) -> TargetWriter {
    let mut open = |name: &str| {
        let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, format!("{}.log", name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);
        writer
    };

    let writers = FILE_TARGETS
        .iter()
        .map(|&target| (target, open(target)))
        .collect();
    let system_writer = open("system");

    TargetWriter {
        writers,
        system_writer,
    }
}

/// Installs the global subscriber: stdout always, plus daily files under
/// `log_dir` when given. Filtering follows `RUST_LOG`, defaulting to info.
pub fn init_logging(log_dir: Option<&Path>) -> LoggingGuards {
    let mut guards = Vec::new();

    let file_layer = log_dir.and_then(|dir| match ensure_dir(dir) {
        Ok(()) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer(dir, &mut guards))
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false),
        ),
        Err(e) => {
            eprintln!("Failed to create log directory {:?}: {}", dir, e);
            None
        }
    });

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global tracing subscriber: {}", e);
    }

    match log_dir {
        Some(dir) => tracing::info!(target: "system", "Logging initialized at {:?}", dir),
        None => tracing::info!(target: "system", "Logging initialized (stdout only)"),
    }

    LoggingGuards { _guards: guards }
}
