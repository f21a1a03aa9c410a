//! # Models
//!
//! Value objects exchanged between the orchestration service, the worker loop
//! and user processing logic.

pub mod task_handle;

pub use task_handle::{ActivityIdentity, ActivityType, PolledTask, TaskHandle, WorkflowExecution};
