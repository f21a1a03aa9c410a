//! # Remote Task Client
//!
//! Contract with the orchestration service: long-poll for tasks, heartbeat, and
//! report terminal outcomes. The worker loop only ever talks to the service
//! through [`RemoteTaskClient`].

pub mod errors;
pub mod http_client;

use crate::models::PolledTask;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

pub use errors::{ClientError, ClientResult};
pub use http_client::{HttpTaskClient, HttpTaskClientConfig};

/// Parameters of one long-poll request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub identity: String,
    pub domain: Option<String>,
    pub task_list: Option<String>,
    /// Server-side long-poll timeout
    pub poll_timeout: Duration,
}

/// Heartbeat acknowledgment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    /// The service recorded a cancellation request for this task
    #[serde(default)]
    pub cancel_requested: bool,
}

/// Orchestration service operations used by the worker
#[async_trait]
pub trait RemoteTaskClient: Send + Sync {
    /// Block until a task is available or the long-poll timeout elapses.
    /// `Ok(None)` is an empty poll.
    async fn poll_task(&self, request: &PollRequest) -> ClientResult<Option<PolledTask>>;

    /// Liveness signal for an in-flight task
    async fn heartbeat(&self, token: &str, details: Option<&Value>) -> ClientResult<HeartbeatAck>;

    async fn report_success(&self, token: &str, result: &Value) -> ClientResult<()>;

    async fn report_failure(&self, token: &str, reason: &str, details: &str) -> ClientResult<()>;
}
