//! # Activity Task State Machine
//!
//! Lifecycle of one polled activity task:
//!
//! ```text
//! Polled ──validate──▶ Validated ──dispatch──▶ Processing ──succeed──▶ Succeeded
//!    │                     │                       │
//!    └──────fail───────────┴─────────fail──────────┴──────────────────▶ Failed
//! ```
//!
//! A task can never reach `Processing` without passing `Validated`, and a
//! terminal state accepts no further events.

pub mod errors;
pub mod events;
pub mod states;
pub mod task_state_machine;

pub use errors::{StateMachineError, StateMachineResult};
pub use events::TaskEvent;
pub use states::ActivityTaskState;
pub use task_state_machine::{TaskStateMachine, TransitionRecord};
