//! # Notification Messages
//!
//! Wire format of the status messages client applications receive:
//!
//! ```json
//! {
//!   "time": 1718000000.123456,
//!   "type": "ACTIVITY_COMPLETED",
//!   "data": {
//!     "workflow": {"workflowId": "...", "runId": "..."},
//!     "activity": {"activityId": "...", "activityType": {...}, "result": {...}}
//!   }
//! }
//! ```
//!
//! `WORKFLOW_SCHEDULED` is the exception: its fields sit next to `time` and
//! `type` instead of under `data`.
//!
//! Messages never carry the task token.

use crate::constants::events;
use crate::models::ActivityIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Notification event taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    WorkflowScheduled,
    ActivityStarted,
    ActivityPreparing,
    ActivityProgress,
    ActivityFinishing,
    ActivityCompleted,
    ActivityFailed,
    ActivityTimeout,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkflowScheduled => events::WORKFLOW_SCHEDULED,
            Self::ActivityStarted => events::ACTIVITY_STARTED,
            Self::ActivityPreparing => events::ACTIVITY_PREPARING,
            Self::ActivityProgress => events::ACTIVITY_PROGRESS,
            Self::ActivityFinishing => events::ACTIVITY_FINISHING,
            Self::ActivityCompleted => events::ACTIVITY_COMPLETED,
            Self::ActivityFailed => events::ACTIVITY_FAILED,
            Self::ActivityTimeout => events::ACTIVITY_TIMEOUT,
        }
    }

    /// Whether the task input is echoed back to the client
    pub fn echoes_input(&self) -> bool {
        matches!(self, Self::ActivityStarted | Self::ActivityTimeout)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-specific payload appended to the `activity` object
#[derive(Debug, Clone, PartialEq)]
pub enum ActivityExtra {
    /// `result` of a completed activity
    Result(Value),
    /// `reason` (error code) and `details` (human cause) of a failed activity
    Failure { reason: String, details: String },
    /// Caller-supplied `progress` payload
    Progress(Value),
}

impl ActivityExtra {
    fn append_to(self, activity: &mut Map<String, Value>) {
        match self {
            Self::Result(result) => {
                activity.insert("result".to_string(), result);
            }
            Self::Failure { reason, details } => {
                activity.insert("reason".to_string(), Value::String(reason));
                activity.insert("details".to_string(), Value::String(details));
            }
            Self::Progress(progress) => {
                activity.insert("progress".to_string(), progress);
            }
        }
    }
}

/// One status message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// Seconds since the Unix epoch, microsecond precision
    pub time: f64,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub data: Value,
}

impl NotificationMessage {
    pub fn new(event_type: EventType, data: Value) -> Self {
        Self::at(Utc::now(), event_type, data)
    }

    pub fn at(time: DateTime<Utc>, event_type: EventType, data: Value) -> Self {
        Self {
            time: epoch_seconds(time),
            event_type,
            data,
        }
    }

    /// Build an activity lifecycle message.
    ///
    /// `input` is included only for events that echo it.
    pub fn for_activity(
        event_type: EventType,
        identity: &ActivityIdentity,
        input: &Value,
        extra: Option<ActivityExtra>,
    ) -> Self {
        let mut activity = Map::new();
        activity.insert(
            "activityId".to_string(),
            Value::String(identity.activity_id.clone()),
        );
        activity.insert(
            "activityType".to_string(),
            json!({
                "name": identity.activity_type.name,
                "version": identity.activity_type.version,
            }),
        );

        if event_type.echoes_input() {
            activity.insert("input".to_string(), input.clone());
        }
        if let Some(extra) = extra {
            extra.append_to(&mut activity);
        }

        let data = json!({
            "workflow": {
                "workflowId": identity.workflow_execution.workflow_id,
                "runId": identity.workflow_execution.run_id,
            },
            "activity": Value::Object(activity),
        });

        Self::new(event_type, data)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// A workflow execution accepted on behalf of a client job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowScheduled {
    pub job_id: String,
    pub run_id: String,
    pub workflow_id: String,
    pub workflow_type: Value,
    /// Client job data; names the output queue at `client.queues.output`
    pub input: Value,
}

#[derive(Serialize)]
struct ScheduledEnvelope<'a> {
    time: f64,
    #[serde(rename = "type")]
    event_type: EventType,
    #[serde(flatten)]
    scheduled: &'a WorkflowScheduled,
}

impl WorkflowScheduled {
    /// Wire form: `{time, type, jobId, runId, workflowId, workflowType, input}`
    pub fn to_value_at(&self, time: DateTime<Utc>) -> serde_json::Result<Value> {
        serde_json::to_value(ScheduledEnvelope {
            time: epoch_seconds(time),
            event_type: EventType::WorkflowScheduled,
            scheduled: self,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.to_value_at(Utc::now())?)
    }
}

fn epoch_seconds(time: DateTime<Utc>) -> f64 {
    time.timestamp_micros() as f64 / 1_000_000.0
}
