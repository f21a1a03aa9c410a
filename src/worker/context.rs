//! # Activity Context
//!
//! What processing logic sees of the task: the parsed input, the heartbeat and
//! cancellation protocol, optional status notifications, and schema checks.

use super::observer::{guarded, ClientObserver};
use crate::client::RemoteTaskClient;
use crate::constants::error_codes;
use crate::error::{ActivityError, Result};
use crate::logging::{self, LogLevel};
use crate::messaging::{MessagingResult, NotificationDispatcher};
use crate::models::{ActivityIdentity, TaskHandle};
use crate::validation::{format_validation_errors, ValidationEngine};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

static NO_INPUT: Value = Value::Null;

/// Per-task context passed to [`ActivityHandler::process`](super::ActivityHandler::process)
///
/// Cloning is cheap; clones may be moved into background tasks that heartbeat
/// while processing continues.
#[derive(Clone)]
pub struct ActivityContext {
    handle: Arc<TaskHandle>,
    client: Arc<dyn RemoteTaskClient>,
    dispatcher: Arc<NotificationDispatcher>,
    observer: Arc<dyn ClientObserver>,
    validator: Option<Arc<dyn ValidationEngine>>,
}

impl std::fmt::Debug for ActivityContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityContext")
            .field("handle", &self.handle)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl ActivityContext {
    pub fn new(
        handle: Arc<TaskHandle>,
        client: Arc<dyn RemoteTaskClient>,
        dispatcher: Arc<NotificationDispatcher>,
        observer: Arc<dyn ClientObserver>,
        validator: Option<Arc<dyn ValidationEngine>>,
    ) -> Self {
        Self {
            handle,
            client,
            dispatcher,
            observer,
            validator,
        }
    }

    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn identity(&self) -> &ActivityIdentity {
        self.handle.identity()
    }

    /// Validated task input
    pub fn input(&self) -> &Value {
        self.handle.input().unwrap_or(&NO_INPUT)
    }

    /// Deserialize the validated input into a typed structure
    pub fn input_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.input().clone()).map_err(|e| {
            ActivityError::input_invalid(format!("Input does not match expected shape: {e}"))
        })
    }

    /// Send a liveness signal for this task.
    ///
    /// Fails with `HEARTBEAT_FAILED` when the service has recorded a
    /// cancellation request, when the call itself fails, or when the task has
    /// already been reported. Processing must unwind on that error.
    pub async fn heartbeat(&self, details: Option<Value>) -> Result<()> {
        let log_key = self.handle.log_key();

        if self.handle.is_closed() {
            return Err(ActivityError::heartbeat_failed(
                "task has already been reported; token is no longer valid",
            ));
        }

        let ack = self
            .client
            .heartbeat(self.handle.token(), details.as_ref())
            .await
            .map_err(|e| {
                warn!(log_key = %log_key, error = %e, "Heartbeat call failed");
                ActivityError::heartbeat_failed(e.to_string())
            })?;

        if ack.cancel_requested {
            warn!(log_key = %log_key, "Cancellation requested for task");
            return Err(ActivityError::heartbeat_failed(
                "cancellation requested by orchestration service",
            ));
        }

        debug!(log_key = %log_key, "Heartbeat acknowledged");
        guarded(
            "on_heartbeat",
            Some(log_key.as_str()),
            self.observer.on_heartbeat(&self.handle, details.as_ref()),
        )
        .await;
        Ok(())
    }

    /// Send an `ACTIVITY_PROGRESS` notification
    pub async fn progress(&self, progress: Value) -> MessagingResult<()> {
        self.dispatcher.activity_progress(&self.handle, progress).await
    }

    /// Send an `ACTIVITY_PREPARING` notification
    pub async fn preparing(&self) -> MessagingResult<()> {
        self.dispatcher.activity_preparing(&self.handle).await
    }

    /// Send an `ACTIVITY_FINISHING` notification
    pub async fn finishing(&self) -> MessagingResult<()> {
        self.dispatcher.activity_finishing(&self.handle).await
    }

    /// Send an `ACTIVITY_TIMEOUT` notification
    pub async fn timed_out(&self) -> MessagingResult<()> {
        self.dispatcher.activity_timeout(&self.handle).await
    }

    /// Check `document` against a schema. Violations are `INPUT_INVALID` with
    /// one `[path] message` line per violation.
    pub fn check_schema(&self, document: &Value, schema_ref: &str) -> Result<()> {
        let validator = self.validator.as_ref().ok_or_else(|| {
            ActivityError::config(
                error_codes::CONFIG_ERROR,
                "no validation engine configured for this worker",
            )
        })?;

        let errors = validator
            .check(document, schema_ref)
            .map_err(|e| ActivityError::config(error_codes::CONFIG_ERROR, e.to_string()))?;

        if errors.is_empty() {
            return Ok(());
        }
        Err(ActivityError::input_invalid(format_validation_errors(&errors)))
    }

    /// Leveled log record keyed to this task
    pub fn log(&self, level: LogLevel, message: &str) {
        logging::record(level, "activity", message, Some(self.handle.log_key().as_str()));
    }
}
