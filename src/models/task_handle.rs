//! # Task Handle
//!
//! One in-flight unit of work: the opaque task token, the activity identity used
//! for correlation, and the task input.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

/// Activity type registered with the orchestration service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityType {
    pub name: String,
    pub version: String,
}

/// Workflow execution that scheduled the activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowExecution {
    pub workflow_id: String,
    pub run_id: String,
}

/// Task as returned by a long-poll
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolledTask {
    pub task_token: String,
    #[serde(default)]
    pub activity_id: String,
    #[serde(default)]
    pub activity_type: ActivityType,
    #[serde(default)]
    pub workflow_execution: WorkflowExecution,
    /// Raw, unparsed input payload
    #[serde(default)]
    pub input: Option<String>,
}

/// Correlation data for logs and notifications. Never used for authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityIdentity {
    pub activity_id: String,
    pub activity_type: ActivityType,
    pub workflow_execution: WorkflowExecution,
}

impl ActivityIdentity {
    /// `workflowId:activityId`, the key attached to every log record of the task
    pub fn log_key(&self) -> String {
        format!(
            "{}:{}",
            self.workflow_execution.workflow_id, self.activity_id
        )
    }
}

/// A polled task for the duration of one loop iteration.
///
/// `input` is set once, by the validation gate. Once a terminal outcome has been
/// reported the handle is closed and its token must not be used again.
pub struct TaskHandle {
    token: String,
    identity: ActivityIdentity,
    raw_input: Option<String>,
    input: OnceLock<Value>,
    closed: AtomicBool,
}

impl TaskHandle {
    /// Build a handle from a poll result; `None` when the poll carried no token
    pub fn from_polled(task: PolledTask) -> Option<Self> {
        if task.task_token.trim().is_empty() {
            return None;
        }

        Some(Self {
            token: task.task_token,
            identity: ActivityIdentity {
                activity_id: task.activity_id,
                activity_type: task.activity_type,
                workflow_execution: task.workflow_execution,
            },
            raw_input: task.input,
            input: OnceLock::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn identity(&self) -> &ActivityIdentity {
        &self.identity
    }

    pub fn log_key(&self) -> String {
        self.identity.log_key()
    }

    /// Raw input as retrieved; empty when the task carried none
    pub fn raw_input(&self) -> &str {
        self.raw_input.as_deref().unwrap_or_default()
    }

    /// Parsed input, present only after validation succeeded
    pub fn input(&self) -> Option<&Value> {
        self.input.get()
    }

    /// Record the parsed input. Returns `false` if it was already set.
    pub fn set_input(&self, input: Value) -> bool {
        self.input.set(input).is_ok()
    }

    /// Mark the token as spent after the terminal report attempt
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("log_key", &self.log_key())
            .field("activity_type", &self.identity.activity_type)
            .field("validated", &self.input.get().is_some())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
