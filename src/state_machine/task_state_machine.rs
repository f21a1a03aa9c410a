use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    states::ActivityTaskState,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// One applied transition
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    pub from: ActivityTaskState,
    pub to: ActivityTaskState,
    pub event: TaskEvent,
    pub at: DateTime<Utc>,
}

/// In-memory lifecycle tracker for a single activity task
#[derive(Debug, Clone, Default)]
pub struct TaskStateMachine {
    state: ActivityTaskState,
    history: Vec<TransitionRecord>,
}

impl TaskStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> ActivityTaskState {
        self.state
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Apply an event, returning the new state
    pub fn transition(&mut self, event: TaskEvent) -> StateMachineResult<ActivityTaskState> {
        let current_state = self.state;
        let target_state = Self::determine_target_state(current_state, &event)?;

        debug!(
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            "Activity task transition"
        );

        self.history.push(TransitionRecord {
            from: current_state,
            to: target_state,
            event,
            at: Utc::now(),
        });
        self.state = target_state;

        Ok(target_state)
    }

    fn determine_target_state(
        current_state: ActivityTaskState,
        event: &TaskEvent,
    ) -> StateMachineResult<ActivityTaskState> {
        if current_state.is_terminal() {
            return Err(StateMachineError::AlreadyTerminal {
                state: current_state.to_string(),
            });
        }

        let target = match (current_state, event) {
            (ActivityTaskState::Polled, TaskEvent::Validate) => ActivityTaskState::Validated,
            (ActivityTaskState::Validated, TaskEvent::Dispatch) => ActivityTaskState::Processing,
            (state, TaskEvent::Succeed) if state.is_active() => ActivityTaskState::Succeeded,

            // Failure is reachable from every non-terminal state
            (_, TaskEvent::Fail { .. }) => ActivityTaskState::Failed,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: from_state.to_string(),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
