use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Task already reached terminal state {state}")]
    AlreadyTerminal { state: String },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
