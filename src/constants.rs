//! # Worker Constants
//!
//! Machine-readable error codes and notification event names shared by the
//! worker loop, the notification protocol and client applications.

/// Machine-readable error codes forwarded to the orchestration service and to
/// `ACTIVITY_FAILED` notifications
pub mod error_codes {
    pub const INPUT_INVALID: &str = "INPUT_INVALID";
    pub const HEARTBEAT_FAILED: &str = "HEARTBEAT_FAILED";
    pub const INVALID_JSON: &str = "INVALID_JSON";
    pub const POLL_ERROR: &str = "POLL_ERROR";
    pub const TRANSPORT_ERROR: &str = "TRANSPORT_ERROR";
    pub const PROCESSING_ERROR: &str = "PROCESSING_ERROR";
    pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
    pub const NO_ACTIVITY_NAME: &str = "NO_ACTIVITY_NAME";
    pub const NO_ACTIVITY_VERSION: &str = "NO_ACTIVITY_VERSION";
}

/// Notification event names as they appear in the `type` field of a message
pub mod events {
    pub const WORKFLOW_SCHEDULED: &str = "WORKFLOW_SCHEDULED";
    pub const ACTIVITY_STARTED: &str = "ACTIVITY_STARTED";
    pub const ACTIVITY_PREPARING: &str = "ACTIVITY_PREPARING";
    pub const ACTIVITY_PROGRESS: &str = "ACTIVITY_PROGRESS";
    pub const ACTIVITY_FINISHING: &str = "ACTIVITY_FINISHING";
    pub const ACTIVITY_COMPLETED: &str = "ACTIVITY_COMPLETED";
    pub const ACTIVITY_FAILED: &str = "ACTIVITY_FAILED";
    pub const ACTIVITY_TIMEOUT: &str = "ACTIVITY_TIMEOUT";
}

/// Timing boundaries for the long-poll protocol
pub mod timing {
    /// Minimum margin between the server-side long-poll timeout and the local
    /// network call timeout
    pub const POLL_TIMEOUT_SAFETY_MARGIN_SECS: u64 = 5;

    /// Default server-side long-poll timeout
    pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 60;

    /// Default backoff after a failed poll before the next iteration
    pub const DEFAULT_POLL_ERROR_BACKOFF_MS: u64 = 1000;

    /// Default bound on one notification send
    pub const DEFAULT_NOTIFICATION_SEND_TIMEOUT_MS: u64 = 5000;

    /// Connection acquire bound for the notification queue pool
    pub const NOTIFICATION_POOL_ACQUIRE_TIMEOUT_SECS: u64 = 5;

    /// How long a message read from an output queue stays hidden
    pub const DEFAULT_VISIBILITY_TIMEOUT_SECS: u64 = 30;
}

/// Path inside the task input that names the client's output queue
pub const OUTPUT_QUEUE_POINTER: &str = "/client/queues/output";
