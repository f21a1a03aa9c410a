#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Activity Worker
//!
//! Worker-side runtime for long-running activities dispatched by a remote
//! workflow orchestration service.
//!
//! ## Overview
//!
//! A worker long-polls the orchestration service for tasks, validates each
//! task's input, hands it to user processing logic, and reports exactly one
//! terminal outcome per task. Lifecycle events are also published as
//! structured notifications to a client-owned queue named by the task input.
//!
//! ## Module Organization
//!
//! - [`worker`] - Poll loop, handler/observer traits and the per-task context
//! - [`client`] - Orchestration service contract and its HTTP implementation
//! - [`messaging`] - Notification protocol and queue transports
//! - [`models`] - Task handle and identity value objects
//! - [`state_machine`] - Per-task lifecycle state machine
//! - [`validation`] - Input gate and JSON-schema checks
//! - [`config`] - Configuration loading and validation
//! - [`bootstrap`] - Building a worker from configuration
//! - [`logging`] - Structured logging setup
//! - [`error`] - Error taxonomy
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use activity_worker::bootstrap::start_worker;
//! use activity_worker::config::ConfigManager;
//! use activity_worker::error::Result;
//! use activity_worker::worker::{ActivityContext, ActivityHandler};
//! use async_trait::async_trait;
//! use serde_json::{json, Value};
//! use std::sync::Arc;
//!
//! struct Transcode;
//!
//! #[async_trait]
//! impl ActivityHandler for Transcode {
//!     async fn process(&self, context: &ActivityContext) -> Result<Value> {
//!         context.heartbeat(Some(json!({"stage": "encoding"}))).await?;
//!         Ok(json!({"status": "done"}))
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let config = ConfigManager::load_from_file("config/activity-worker.yaml")?;
//! let handle = start_worker(&config, Arc::new(Transcode), None).await?;
//! tokio::signal::ctrl_c().await.ok();
//! let stats = handle.stop().await?;
//! println!("processed {} tasks", stats.tasks_processed());
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod state_machine;
pub mod validation;
pub mod worker;

pub use client::{HttpTaskClient, RemoteTaskClient};
pub use config::{ConfigManager, WorkerConfig};
pub use error::{ActivityError, ErrorKind, Result};
pub use messaging::{NotificationDispatcher, NotificationListener, NotificationTransport};
pub use models::TaskHandle;
pub use worker::{
    ActivityContext, ActivityHandler, ActivityWorker, ClientObserver, NoopObserver, WorkerStats,
};
