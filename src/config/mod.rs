//! # Worker Configuration
//!
//! Explicit, validated configuration for one activity worker. Everything the
//! worker needs to build its remote clients is passed in through this structure;
//! there are no process-wide client singletons.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use activity_worker::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load_from_file("config/activity-worker.yaml")?;
//! let poll_timeout = config.worker.poll_timeout();
//! let identity = config.worker_identity();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::timing;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration for an activity worker process
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub activity: ActivityConfig,
    pub worker: PollingConfig,
    pub orchestration: OrchestrationConfig,
    pub notification: NotificationConfig,
    pub logging: LoggingConfig,
    pub validation: ValidationConfig,
}

/// Identity of the activity this worker serves
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ActivityConfig {
    pub name: String,
    pub version: String,
    /// Orchestration domain the activity lives in
    pub domain: Option<String>,
    /// Task list (or activity ARN) polled for work
    pub task_list: Option<String>,
}

/// Long-poll loop tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Worker identity reported with every poll; generated when absent
    pub identity: Option<String>,
    /// Server-side long-poll timeout
    pub poll_timeout_seconds: u64,
    /// Local network call timeout; must exceed the poll timeout by the safety margin
    pub network_timeout_seconds: u64,
    /// Pause after a failed poll before polling again
    pub poll_error_backoff_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            identity: None,
            poll_timeout_seconds: timing::DEFAULT_POLL_TIMEOUT_SECS,
            network_timeout_seconds: timing::DEFAULT_POLL_TIMEOUT_SECS
                + 2 * timing::POLL_TIMEOUT_SAFETY_MARGIN_SECS,
            poll_error_backoff_ms: timing::DEFAULT_POLL_ERROR_BACKOFF_MS,
        }
    }
}

impl PollingConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_seconds)
    }

    pub fn poll_error_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_error_backoff_ms)
    }
}

/// Connection settings for the orchestration service
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub region: Option<String>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            region: None,
        }
    }
}

/// Notification channel settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// PostgreSQL URL of the pgmq database hosting client output queues
    pub database_url: Option<String>,
    /// Upper bound on a single queue send
    pub send_timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: None,
            send_timeout_ms: timing::DEFAULT_NOTIFICATION_SEND_TIMEOUT_MS,
        }
    }
}

impl NotificationConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Log sink settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    /// `EnvFilter` directive, e.g. `info` or `activity_worker=debug`
    pub level: String,
    pub console: bool,
    pub json_file: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/tmp/logs/activity-worker"),
            level: "info".to_string(),
            console: true,
            json_file: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Directory holding JSON schema documents referenced by activities
    pub schemas_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Minimal configuration for the given activity, with defaults elsewhere
    pub fn for_activity(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            activity: ActivityConfig {
                name: name.into(),
                version: version.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Validate startup parameters. Any error here is fatal.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.activity.name.trim().is_empty() {
            return Err(ConfigurationError::MissingActivityName);
        }
        if self.activity.version.trim().is_empty() {
            return Err(ConfigurationError::MissingActivityVersion);
        }

        if self.worker.poll_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "worker.poll_timeout_seconds",
                "0",
                "long-poll timeout must be greater than zero",
            ));
        }

        let minimum_network_timeout =
            self.worker.poll_timeout_seconds + timing::POLL_TIMEOUT_SAFETY_MARGIN_SECS;
        if self.worker.network_timeout_seconds < minimum_network_timeout {
            return Err(ConfigurationError::invalid_value(
                "worker.network_timeout_seconds",
                self.worker.network_timeout_seconds.to_string(),
                format!(
                    "must be at least poll_timeout_seconds + {}s ({minimum_network_timeout}s)",
                    timing::POLL_TIMEOUT_SAFETY_MARGIN_SECS
                ),
            ));
        }

        if self.notification.send_timeout_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "notification.send_timeout_ms",
                "0",
                "notification send timeout must be greater than zero",
            ));
        }

        if self.orchestration.base_url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "base_url",
                "orchestration",
            ));
        }

        if let Some(identity) = &self.worker.identity {
            if identity.trim().is_empty() {
                return Err(ConfigurationError::invalid_value(
                    "worker.identity",
                    identity.clone(),
                    "identity must not be blank when provided",
                ));
            }
        }

        Ok(())
    }

    /// Worker identity sent with every poll
    pub fn worker_identity(&self) -> String {
        self.worker
            .identity
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.activity.name, uuid::Uuid::new_v4()))
    }
}
