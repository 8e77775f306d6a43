use anyhow::Result;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry, fmt::time::ChronoUtc, layer::SubscriberExt, util::SubscriberInitExt,
};
use uuid::Uuid;

const LOG_FILE_PREFIX: &str = "ytab-";

#[derive(Debug)]
pub struct LogConfig {
    pub level: String,
    pub directory: PathBuf,
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: crate::config::data_dir().join("logs"),
            max_log_files: 10,
        }
    }
}

/// Keeps the non-blocking writer alive; logs stop flushing once dropped.
pub struct Logger {
    session_id: Uuid,
    _guard: WorkerGuard,
}

impl Logger {
    /// Installs a JSON file subscriber. The terminal belongs to the TUI, so
    /// nothing is ever written to stdout.
    pub fn new(config: &LogConfig) -> Result<Self> {
        let session_id = Uuid::new_v4();

        fs::create_dir_all(&config.directory)?;
        cleanup_old_logs(&config.directory, config.max_log_files)?;

        let file_name = format!(
            "{}{}.log",
            LOG_FILE_PREFIX,
            Utc::now().format("%Y%m%d-%H%M%S")
        );
        let file_appender = tracing_appender::rolling::never(&config.directory, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_timer(ChronoUtc::rfc_3339())
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_file(true)
            .json();

        Registry::default().with(filter).with(file_layer).try_init()?;

        info!(
            session_id = %session_id,
            version = env!("CARGO_PKG_VERSION"),
            "Starting ytab session"
        );

        Ok(Logger {
            session_id,
            _guard: guard,
        })
    }

    pub fn session_id(&self) -> &Uuid {
        &self.session_id
    }
}

/// Removes all but the newest `max_files` ytab log files. Returns how many
/// were removed.
pub fn cleanup_old_logs(log_dir: &Path, max_files: usize) -> Result<usize> {
    let entries = fs::read_dir(log_dir)?;
    let mut log_files: Vec<_> = entries
        .filter_map(|entry| {
            let entry = entry.ok()?;
            let path = entry.path();
            if path.is_file()
                && path.file_name()?.to_str()?.starts_with(LOG_FILE_PREFIX)
                && path.extension()? == "log"
            {
                let metadata = entry.metadata().ok()?;
                Some((path, metadata.modified().ok()?))
            } else {
                None
            }
        })
        .collect();

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = 0;
    for (path, _) in log_files.into_iter().skip(max_files) {
        match fs::remove_file(&path) {
            Ok(()) => {
                removed += 1;
                info!(file = %path.display(), "Removed old log file");
            }
            Err(e) => warn!(
                error = %e,
                file = %path.display(),
                "Failed to remove old log file"
            ),
        }
    }

    Ok(removed)
}

// Short id for correlating a request with its completion in the log.
pub fn generate_request_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

#[macro_export]
macro_rules! log_api_request {
    ($method:expr, $url:expr, $request_id:expr) => {
        tracing::info!(
            request_id = $request_id,
            method = $method,
            url = $url,
            "API request initiated"
        );
    };
}

#[macro_export]
macro_rules! log_api_response {
    ($request_id:expr, $status:expr, $duration_ms:expr) => {
        tracing::info!(
            request_id = $request_id,
            status = $status,
            duration_ms = $duration_ms,
            "API response received"
        );
    };
}

#[macro_export]
macro_rules! log_api_error {
    ($request_id:expr, $error:expr, $duration_ms:expr) => {
        tracing::error!(
            request_id = $request_id,
            error = %$error,
            duration_ms = $duration_ms,
            "API request failed"
        );
    };
}

#[macro_export]
macro_rules! log_state_transition {
    ($from:expr, $to:expr, $context:expr) => {
        tracing::debug!(
            from_state = ?$from,
            to_state = ?$to,
            context = %$context,
            "State transition"
        );
    };
}

#[macro_export]
macro_rules! log_user_action {
    ($action:expr, $context:expr) => {
        tracing::info!(
            user_action = $action,
            context = %$context,
            "User action performed"
        );
    };
}
