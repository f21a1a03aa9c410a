use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of a polled activity task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTaskState {
    /// Task token received from a poll
    #[default]
    Polled,
    /// Input decoded successfully
    Validated,
    /// User processing logic is running
    Processing,
    /// Success reported
    Succeeded,
    /// Failure reported
    Failed,
}

impl ActivityTaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Check if user processing logic is running
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }
}

impl fmt::Display for ActivityTaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polled => write!(f, "polled"),
            Self::Validated => write!(f, "validated"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ActivityTaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polled" => Ok(Self::Polled),
            "validated" => Ok(Self::Validated),
            "processing" => Ok(Self::Processing),
            "succeeded" => Ok(Self::Succeeded),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid activity task state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(ActivityTaskState::Succeeded.is_terminal());
        assert!(ActivityTaskState::Failed.is_terminal());
        assert!(!ActivityTaskState::Polled.is_terminal());
        assert!(!ActivityTaskState::Validated.is_terminal());
        assert!(!ActivityTaskState::Processing.is_terminal());
    }

    #[test]
    fn test_only_processing_is_active() {
        assert!(ActivityTaskState::Processing.is_active());
        assert!(!ActivityTaskState::Validated.is_active());
        assert!(!ActivityTaskState::Succeeded.is_active());
    }

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(ActivityTaskState::Processing.to_string(), "processing");
        assert_eq!(
            "succeeded".parse::<ActivityTaskState>().unwrap(),
            ActivityTaskState::Succeeded
        );
        assert!("complete".parse::<ActivityTaskState>().is_err());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&ActivityTaskState::Validated).unwrap();
        assert_eq!(json, "\"validated\"");
    }
}
