//! # Remote Client Errors

use thiserror::Error;

/// Failures of calls to the orchestration service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Request failed: {operation}: {message}")]
    Request { operation: String, message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("HTTP {status} from {operation}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Protocol error: {operation}: {message}")]
    Protocol { operation: String, message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl ClientError {
    pub fn request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Request {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
