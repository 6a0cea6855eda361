use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::env_bool;

const LOG_FILE_PREFIX: &str = "calibra.log";

/// Keeps the non-blocking file writer flushing until dropped.
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLogOptions {
    pub dir: PathBuf,
}

impl FileLogOptions {
    /// `ENABLE_FILE_LOGS` switches the daily log file on; `LOG_DIR` places it.
    pub fn from_env() -> Option<Self> {
        if !env_bool("ENABLE_FILE_LOGS").unwrap_or(false) {
            return None;
        }
        let dir = std::env::var("LOG_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "./logs".to_string());
        Some(Self {
            dir: PathBuf::from(dir),
        })
    }
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(options) = FileLogOptions::from_env() {
        match std::fs::create_dir_all(&options.dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, &options.dir, LOG_FILE_PREFIX);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                return Some(FileLogGuard { _guard: guard });
            }
            Err(err) => {
                eprintln!(
                    "failed to create log directory {}: {err}",
                    options.dir.display()
                );
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}
