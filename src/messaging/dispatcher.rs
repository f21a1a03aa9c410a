//! # Notification Dispatcher
//!
//! Turns lifecycle events into [`NotificationMessage`]s and delivers them to
//! the output queue named by the task input.
//!
//! The raw input is re-parsed on every send, independently of the worker's own
//! validation state, so an unparseable input always yields `INVALID_JSON`.

use super::errors::{MessagingError, MessagingResult};
use super::message::{ActivityExtra, EventType, NotificationMessage, WorkflowScheduled};
use super::transport::NotificationTransport;
use crate::constants::{timing, OUTPUT_QUEUE_POINTER};
use crate::models::TaskHandle;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Extract the client output queue from a task input document
pub fn output_queue(input: &Value) -> MessagingResult<String> {
    input
        .pointer(OUTPUT_QUEUE_POINTER)
        .and_then(Value::as_str)
        .filter(|queue| !queue.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| MessagingError::MissingOutputQueue {
            pointer: OUTPUT_QUEUE_POINTER.to_string(),
        })
}

/// Build the message for a lifecycle event and resolve its destination queue
pub fn build_activity_msg(
    handle: &TaskHandle,
    event_type: EventType,
    extra: Option<ActivityExtra>,
) -> MessagingResult<(String, NotificationMessage)> {
    let raw_input = handle.raw_input();
    if raw_input.trim().is_empty() {
        return Err(MessagingError::invalid_json("task carried no input"));
    }

    let input: Value = serde_json::from_str(raw_input)
        .map_err(|e| MessagingError::invalid_json(e.to_string()))?;
    let queue = output_queue(&input)?;

    let message = NotificationMessage::for_activity(event_type, handle.identity(), &input, extra);
    Ok((queue, message))
}

/// Sends activity status messages to client applications
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn NotificationTransport>,
    enabled: bool,
    send_timeout: Duration,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("enabled", &self.enabled)
            .field("send_timeout", &self.send_timeout)
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self {
            transport,
            enabled: true,
            send_timeout: Duration::from_millis(timing::DEFAULT_NOTIFICATION_SEND_TIMEOUT_MS),
        }
    }

    /// When disabled, messages are still built (and input still checked) but
    /// never handed to the transport
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Upper bound on a single transport send; a stalled queue never holds up a task
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Build and deliver one activity lifecycle message
    pub async fn send_activity_msg(
        &self,
        handle: &TaskHandle,
        event_type: EventType,
        extra: Option<ActivityExtra>,
    ) -> MessagingResult<()> {
        let (queue, message) = build_activity_msg(handle, event_type, extra)?;
        let body = message.to_json()?;
        self.deliver(&queue, event_type, &body, &handle.log_key())
            .await
    }

    pub async fn activity_started(&self, handle: &TaskHandle) -> MessagingResult<()> {
        self.send_activity_msg(handle, EventType::ActivityStarted, None)
            .await
    }

    pub async fn activity_preparing(&self, handle: &TaskHandle) -> MessagingResult<()> {
        self.send_activity_msg(handle, EventType::ActivityPreparing, None)
            .await
    }

    pub async fn activity_progress(
        &self,
        handle: &TaskHandle,
        progress: Value,
    ) -> MessagingResult<()> {
        self.send_activity_msg(
            handle,
            EventType::ActivityProgress,
            Some(ActivityExtra::Progress(progress)),
        )
        .await
    }

    pub async fn activity_finishing(&self, handle: &TaskHandle) -> MessagingResult<()> {
        self.send_activity_msg(handle, EventType::ActivityFinishing, None)
            .await
    }

    pub async fn activity_completed(
        &self,
        handle: &TaskHandle,
        result: &Value,
    ) -> MessagingResult<()> {
        self.send_activity_msg(
            handle,
            EventType::ActivityCompleted,
            Some(ActivityExtra::Result(result.clone())),
        )
        .await
    }

    pub async fn activity_failed(
        &self,
        handle: &TaskHandle,
        reason: &str,
        details: &str,
    ) -> MessagingResult<()> {
        self.send_activity_msg(
            handle,
            EventType::ActivityFailed,
            Some(ActivityExtra::Failure {
                reason: reason.to_string(),
                details: details.to_string(),
            }),
        )
        .await
    }

    pub async fn activity_timeout(&self, handle: &TaskHandle) -> MessagingResult<()> {
        self.send_activity_msg(handle, EventType::ActivityTimeout, None)
            .await
    }

    /// Tell a client its job has been accepted as a workflow execution
    pub async fn workflow_scheduled(&self, scheduled: &WorkflowScheduled) -> MessagingResult<()> {
        let queue = output_queue(&scheduled.input)?;
        let body = scheduled.to_json()?;
        self.deliver(
            &queue,
            EventType::WorkflowScheduled,
            &body,
            &scheduled.workflow_id,
        )
        .await
    }

    async fn deliver(
        &self,
        queue: &str,
        event_type: EventType,
        body: &str,
        log_key: &str,
    ) -> MessagingResult<()> {
        if !self.enabled {
            debug!(
                log_key = %log_key,
                event = %event_type,
                "Notifications disabled, message not sent"
            );
            return Ok(());
        }

        let sent = match tokio::time::timeout(self.send_timeout, self.transport.send(queue, body))
            .await
        {
            Ok(sent) => sent,
            Err(_) => Err(MessagingError::queue_operation(
                queue,
                "send",
                format!("timed out after {}ms", self.send_timeout.as_millis()),
            )),
        };

        if let Err(e) = sent {
            warn!(
                log_key = %log_key,
                queue = %queue,
                event = %event_type,
                error = %e,
                "Failed to deliver notification"
            );
            return Err(e);
        }

        debug!(
            log_key = %log_key,
            queue = %queue,
            event = %event_type,
            "Notification delivered"
        );
        Ok(())
    }
}
