//! # Worker Bootstrap
//!
//! Builds an [`ActivityWorker`] from explicit configuration: the orchestration
//! client, the notification transport and the optional schema validator are
//! all constructed here and passed in, never read from process-wide state.
//!
//! Any error returned from this module is fatal and happens before the loop
//! starts.

use crate::client::{HttpTaskClient, HttpTaskClientConfig, RemoteTaskClient};
use crate::config::WorkerConfig;
use crate::constants::error_codes;
use crate::error::{ActivityError, Result};
use crate::logging::init_structured_logging;
use crate::messaging::{InMemoryTransport, NotificationDispatcher, NotificationTransport};
use crate::validation::{JsonSchemaValidator, ValidationEngine};
use crate::worker::{
    shutdown_channel, ActivityHandler, ActivityWorker, ActivityWorkerConfig, ClientObserver,
    ShutdownHandle, WorkerStats,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Build a worker from configuration.
///
/// Validates `config` first; a missing activity name or version is reported
/// with `NO_ACTIVITY_NAME` / `NO_ACTIVITY_VERSION`.
pub async fn build_worker(
    config: &WorkerConfig,
    handler: Arc<dyn ActivityHandler>,
    observer: Option<Arc<dyn ClientObserver>>,
) -> Result<ActivityWorker> {
    config.validate()?;

    let client_config =
        HttpTaskClientConfig::from_worker_config(&config.orchestration, &config.worker);
    let client: Arc<dyn RemoteTaskClient> = Arc::new(
        HttpTaskClient::new(client_config)
            .map_err(|e| ActivityError::config(error_codes::CONFIG_ERROR, e.to_string()))?,
    );

    let dispatcher = Arc::new(notification_dispatcher(config).await?);
    let notifications_enabled = dispatcher.is_enabled();

    let mut worker = ActivityWorker::new(
        client,
        dispatcher,
        handler,
        ActivityWorkerConfig::from_worker_config(config),
    );

    if let Some(observer) = observer {
        worker = worker.with_observer(observer);
    }

    if let Some(schemas_dir) = &config.validation.schemas_dir {
        let validator: Arc<dyn ValidationEngine> = Arc::new(JsonSchemaValidator::new(schemas_dir));
        worker = worker.with_validator(validator);
    }

    info!(
        activity = %config.activity.name,
        version = %config.activity.version,
        notifications_enabled = notifications_enabled,
        "Activity worker built"
    );
    Ok(worker)
}

/// Notifications are only sent when a queue backend is configured; without one
/// the dispatcher still checks task input but never sends.
async fn notification_dispatcher(config: &WorkerConfig) -> Result<NotificationDispatcher> {
    let dispatcher = match notification_backend(config).await? {
        Some(transport) => NotificationDispatcher::new(transport),
        None => {
            if config.notification.enabled {
                warn!("No notification queue backend configured; notifications disabled");
            }
            NotificationDispatcher::new(Arc::new(InMemoryTransport::new())).with_enabled(false)
        }
    };
    Ok(dispatcher.with_send_timeout(config.notification.send_timeout()))
}

#[cfg(feature = "postgres")]
async fn notification_backend(
    config: &WorkerConfig,
) -> Result<Option<Arc<dyn NotificationTransport>>> {
    use crate::messaging::PgmqNotificationTransport;

    match (&config.notification.database_url, config.notification.enabled) {
        (Some(database_url), true) => {
            let transport = PgmqNotificationTransport::new(database_url)
                .await
                .map_err(|e| ActivityError::config(error_codes::CONFIG_ERROR, e.to_string()))?;
            Ok(Some(Arc::new(transport)))
        }
        _ => Ok(None),
    }
}

#[cfg(not(feature = "postgres"))]
async fn notification_backend(
    _config: &WorkerConfig,
) -> Result<Option<Arc<dyn NotificationTransport>>> {
    Ok(None)
}

/// A worker loop running on the tokio runtime
pub struct WorkerSystemHandle {
    identity: String,
    shutdown: ShutdownHandle,
    join_handle: JoinHandle<WorkerStats>,
}

impl WorkerSystemHandle {
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn is_running(&self) -> bool {
        !self.join_handle.is_finished()
    }

    /// Request shutdown and wait for the in-flight iteration to finish
    pub async fn stop(self) -> Result<WorkerStats> {
        self.shutdown.shutdown();
        self.join_handle.await.map_err(|e| {
            ActivityError::processing(format!("worker loop terminated abnormally: {e}"))
        })
    }
}

/// Initialize logging, build a worker and spawn its loop
pub async fn start_worker(
    config: &WorkerConfig,
    handler: Arc<dyn ActivityHandler>,
    observer: Option<Arc<dyn ClientObserver>>,
) -> Result<WorkerSystemHandle> {
    init_structured_logging(&config.logging, &config.activity.name);
    let worker = build_worker(config, handler, observer).await?;
    Ok(spawn_worker(worker, config.worker_identity()))
}

/// Spawn the loop of an already-built worker
pub fn spawn_worker(worker: ActivityWorker, identity: String) -> WorkerSystemHandle {
    let (shutdown, signal) = shutdown_channel();
    let loop_identity = identity.clone();
    let join_handle = tokio::spawn(async move { worker.run(&loop_identity, signal).await });

    WorkerSystemHandle {
        identity,
        shutdown,
        join_handle,
    }
}
