//! # Messaging Error Types

use crate::constants::error_codes;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessagingError {
    #[error("Task input JSON is invalid: {message}")]
    InvalidJson { message: String },

    #[error("Task input does not name an output queue at {pointer}")]
    MissingOutputQueue { pointer: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },
}

impl MessagingError {
    pub fn invalid_json(message: impl Into<String>) -> Self {
        Self::InvalidJson {
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn database_connection(message: impl Into<String>) -> Self {
        Self::DatabaseConnection {
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => error_codes::INVALID_JSON,
            _ => error_codes::TRANSPORT_ERROR,
        }
    }
}

impl From<serde_json::Error> for MessagingError {
    fn from(err: serde_json::Error) -> Self {
        MessagingError::message_serialization(err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
