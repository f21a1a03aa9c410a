//! # Activity Worker
//!
//! The poll → validate → dispatch → report loop, the capability traits user
//! code implements, and the per-task context handed to processing logic.

pub mod activity_worker;
pub mod context;
pub mod handler;
pub mod observer;
pub mod shutdown;

pub use activity_worker::{ActivityWorker, ActivityWorkerConfig, IterationOutcome, WorkerStats};
pub use context::ActivityContext;
pub use handler::ActivityHandler;
pub use observer::{ClientObserver, NoopObserver};
pub use shutdown::{shutdown_channel, ShutdownHandle, ShutdownSignal};
