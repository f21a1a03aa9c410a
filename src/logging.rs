//! # Structured Logging Module
//!
//! Console and JSON-file logging for the worker process, plus the leveled
//! record interface used for activity lifecycle logging.

use crate::config::LoggingConfig;
use std::fmt;
use std::fs;
use std::process;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_subscriber::{
    fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console and file logging for an activity worker.
///
/// The file sink writes JSON lines to `<log_dir>/<activity_name>.log`. Calling
/// this more than once is a no-op, and an already-installed global subscriber
/// is left in place.
pub fn init_structured_logging(config: &LoggingConfig, activity_name: &str) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let mut file_guard = None;

        let console_layer = config.console.then(|| {
            tracing_fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(EnvFilter::new(&config.level))
        });

        let file_layer = if config.json_file {
            match fs::create_dir_all(&config.log_dir) {
                Ok(()) => {
                    let file_appender = tracing_appender::rolling::never(
                        &config.log_dir,
                        format!("{activity_name}.log"),
                    );
                    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                    file_guard = Some(guard);
                    Some(
                        tracing_fmt::layer()
                            .with_writer(file_writer)
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_level(true)
                            .with_ansi(false)
                            .json()
                            .with_filter(EnvFilter::new(&config.level)),
                    )
                }
                Err(e) => {
                    eprintln!(
                        "Unable to create log directory {}: {e}; logging to console only",
                        config.log_dir.display()
                    );
                    None
                }
            }
        } else {
            None
        };

        let subscriber = tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized, keeping it");
        }

        tracing::info!(
            pid = process::id(),
            activity = %activity_name,
            log_dir = %config.log_dir.display(),
            "Logging initialized"
        );

        // The non-blocking writer flushes on guard drop; keep it for the process lifetime
        if let Some(guard) = file_guard {
            std::mem::forget(guard);
        }
    });
}

/// Severity levels accepted by [`record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Fatal => write!(f, "FATAL"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            _ => Err(format!("Unknown log level: {s}")),
        }
    }
}

/// Emit one leveled log record.
///
/// `log_key` is the `workflowId:activityId` correlation key of the task being
/// processed, when there is one. Never fails.
pub fn record(level: LogLevel, source: &str, message: &str, log_key: Option<&str>) {
    match level {
        LogLevel::Debug => tracing::debug!(source = %source, log_key = log_key, "{message}"),
        LogLevel::Info => tracing::info!(source = %source, log_key = log_key, "{message}"),
        LogLevel::Warning => tracing::warn!(source = %source, log_key = log_key, "{message}"),
        LogLevel::Error => tracing::error!(source = %source, log_key = log_key, "{message}"),
        LogLevel::Fatal => {
            tracing::error!(source = %source, log_key = log_key, fatal = true, "{message}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("WARN".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert_eq!("FATAL".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert!("TRACE".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Error.to_string(), "ERROR");
    }

    #[test]
    fn test_record_never_panics_without_subscriber() {
        record(LogLevel::Fatal, "logging.rs", "no subscriber installed", None);
        record(LogLevel::Info, "logging.rs", "with key", Some("wf-1:act-1"));
    }
}
