//! # Activity Handler Trait
//!
//! The processing logic activities implement.

use super::context::ActivityContext;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// User processing logic for one activity type
///
/// The worker only calls [`process`](ActivityHandler::process) with input that
/// has already passed the validation gate.
#[async_trait]
pub trait ActivityHandler: Send + Sync {
    /// Process one task
    ///
    /// # Arguments
    ///
    /// * `context` - Parsed input plus heartbeat and notification operations
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The task result, reported as success. `null` is reported
    ///   as an empty object.
    /// * `Err` - Reported as failure using the error's code and cause
    async fn process(&self, context: &ActivityContext) -> Result<Value>;

    /// Name used in log records
    ///
    /// Default implementation returns the type name.
    fn handler_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
