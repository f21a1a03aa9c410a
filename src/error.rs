//! # Activity Error Taxonomy
//!
//! Every failure the worker can observe is one of a small set of kinds. Each kind
//! carries a machine-readable code (forwarded to the orchestration service and to
//! the notification channel) and a fatal/recoverable classification that the
//! poll loop consults before deciding whether to keep going.

use crate::config::ConfigurationError;
use crate::constants::error_codes;
use thiserror::Error;

/// Classification of an [`ActivityError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or inconsistent startup parameter
    Config,
    /// Task payload could not be decoded
    InputInvalid,
    /// Notification dispatcher could not parse the task input
    InvalidJson,
    /// Long-poll call failed
    Poll,
    /// Heartbeat/report call failed on the wire
    Transport,
    /// Cancellation requested or heartbeat transport failure
    HeartbeatFailed,
    /// Error raised by user processing logic
    Processing,
}

impl ErrorKind {
    /// Fatal kinds abort the worker before the loop starts; everything else is
    /// contained within a single loop iteration.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActivityError {
    #[error("Configuration error: [{code}] {message}")]
    Config { code: String, message: String },

    #[error("Input invalid: {message}")]
    InputInvalid { message: String },

    #[error("Invalid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Poll failed: {message}")]
    Poll { message: String },

    #[error("Transport error during {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Heartbeat failed: {message}")]
    HeartbeatFailed { message: String },

    #[error("Processing error: [{code}] {cause}")]
    Processing { code: String, cause: String },
}

impl ActivityError {
    pub fn config(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn input_invalid(message: impl Into<String>) -> Self {
        Self::InputInvalid {
            message: message.into(),
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    pub fn poll(message: impl Into<String>) -> Self {
        Self::Poll {
            message: message.into(),
        }
    }

    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn heartbeat_failed(message: impl Into<String>) -> Self {
        Self::HeartbeatFailed {
            message: message.into(),
        }
    }

    /// Generic processing failure with the default `PROCESSING_ERROR` code
    pub fn processing(cause: impl Into<String>) -> Self {
        Self::Processing {
            code: error_codes::PROCESSING_ERROR.to_string(),
            cause: cause.into(),
        }
    }

    /// Processing failure with an activity-specific code
    pub fn processing_with_code(code: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Processing {
            code: code.into(),
            cause: cause.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config { .. } => ErrorKind::Config,
            Self::InputInvalid { .. } => ErrorKind::InputInvalid,
            Self::InvalidJson { .. } => ErrorKind::InvalidJson,
            Self::Poll { .. } => ErrorKind::Poll,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::HeartbeatFailed { .. } => ErrorKind::HeartbeatFailed,
            Self::Processing { .. } => ErrorKind::Processing,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Machine-readable code used as the failure `reason`
    pub fn code(&self) -> &str {
        match self {
            Self::Config { code, .. } | Self::Processing { code, .. } => code,
            Self::InputInvalid { .. } => error_codes::INPUT_INVALID,
            Self::InvalidJson { .. } => error_codes::INVALID_JSON,
            Self::Poll { .. } => error_codes::POLL_ERROR,
            Self::Transport { .. } => error_codes::TRANSPORT_ERROR,
            Self::HeartbeatFailed { .. } => error_codes::HEARTBEAT_FAILED,
        }
    }

    /// Human-readable cause used as the failure `details`
    pub fn cause(&self) -> &str {
        match self {
            Self::Config { message, .. }
            | Self::InputInvalid { message }
            | Self::InvalidJson { message }
            | Self::Poll { message }
            | Self::Transport { message, .. }
            | Self::HeartbeatFailed { message } => message,
            Self::Processing { cause, .. } => cause,
        }
    }
}

impl From<ConfigurationError> for ActivityError {
    fn from(err: ConfigurationError) -> Self {
        ActivityError::config(err.code(), err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ActivityError>;
