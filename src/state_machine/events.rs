use serde::{Deserialize, Serialize};

/// Events that drive an activity task through its lifecycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Input decoded
    Validate,
    /// Hand the task to user processing logic
    Dispatch,
    /// Success reported
    Succeed,
    /// Failure reported with its error code
    Fail { code: String },
}

impl TaskEvent {
    pub fn fail(code: impl Into<String>) -> Self {
        Self::Fail { code: code.into() }
    }

    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::Dispatch => "dispatch",
            Self::Succeed => "succeed",
            Self::Fail { .. } => "fail",
        }
    }
}
