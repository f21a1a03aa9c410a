//! # Activity Worker Loop
//!
//! One worker instance runs a single poll → validate → dispatch → report loop.
//! A new poll is never issued while a task from the previous iteration is in
//! flight, and every task that arrives with a token gets exactly one terminal
//! report attempt.

use super::context::ActivityContext;
use super::handler::ActivityHandler;
use super::observer::{guarded, panic_message, ClientObserver, NoopObserver};
use super::shutdown::ShutdownSignal;
use crate::client::{PollRequest, RemoteTaskClient};
use crate::config::WorkerConfig;
use crate::constants::timing;
use crate::error::{ActivityError, Result};
use crate::messaging::NotificationDispatcher;
use crate::models::TaskHandle;
use crate::state_machine::{TaskEvent, TaskStateMachine};
use crate::validation::{validate_input, ValidationEngine};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Runtime settings of the poll loop
#[derive(Debug, Clone)]
pub struct ActivityWorkerConfig {
    pub activity_name: String,
    pub domain: Option<String>,
    pub task_list: Option<String>,
    /// Server-side long-poll timeout
    pub poll_timeout: Duration,
    /// Local bound on the poll call; at least `poll_timeout` plus the safety margin
    pub network_timeout: Duration,
    /// Pause after a failed poll
    pub poll_error_backoff: Duration,
}

impl Default for ActivityWorkerConfig {
    fn default() -> Self {
        Self {
            activity_name: String::new(),
            domain: None,
            task_list: None,
            poll_timeout: Duration::from_secs(timing::DEFAULT_POLL_TIMEOUT_SECS),
            network_timeout: Duration::from_secs(
                timing::DEFAULT_POLL_TIMEOUT_SECS + timing::POLL_TIMEOUT_SAFETY_MARGIN_SECS + 5,
            ),
            poll_error_backoff: Duration::from_millis(timing::DEFAULT_POLL_ERROR_BACKOFF_MS),
        }
    }
}

impl ActivityWorkerConfig {
    /// Smallest network timeout that leaves the safety margin over `poll_timeout`
    pub fn minimum_network_timeout(&self) -> Duration {
        self.poll_timeout + Duration::from_secs(timing::POLL_TIMEOUT_SAFETY_MARGIN_SECS)
    }

    pub fn from_worker_config(config: &WorkerConfig) -> Self {
        Self {
            activity_name: config.activity.name.clone(),
            domain: config.activity.domain.clone(),
            task_list: config.activity.task_list.clone(),
            poll_timeout: config.worker.poll_timeout(),
            network_timeout: config.worker.network_timeout(),
            poll_error_backoff: config.worker.poll_error_backoff(),
        }
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// No task was available
    EmptyPoll,
    /// The poll call failed; no task was retrieved
    PollFailed,
    /// Success reported
    Succeeded,
    /// Failure reported with this code
    Failed { code: String },
    /// The terminal report call itself failed; the token was abandoned
    ReportFailed,
}

/// Counters accumulated by [`ActivityWorker::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub polls: u64,
    pub empty_polls: u64,
    pub poll_errors: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub report_errors: u64,
}

impl WorkerStats {
    fn record(&mut self, outcome: &IterationOutcome) {
        self.polls += 1;
        match outcome {
            IterationOutcome::EmptyPoll => self.empty_polls += 1,
            IterationOutcome::PollFailed => self.poll_errors += 1,
            IterationOutcome::Succeeded => self.tasks_succeeded += 1,
            IterationOutcome::Failed { .. } => self.tasks_failed += 1,
            IterationOutcome::ReportFailed => self.report_errors += 1,
        }
    }

    /// Tasks that reached a terminal report attempt
    pub fn tasks_processed(&self) -> u64 {
        self.tasks_succeeded + self.tasks_failed + self.report_errors
    }
}

/// Polls the orchestration service and runs user processing logic
///
/// A `network_timeout` below `poll_timeout` plus the safety margin is raised
/// to that minimum on construction.
pub struct ActivityWorker {
    client: Arc<dyn RemoteTaskClient>,
    dispatcher: Arc<NotificationDispatcher>,
    handler: Arc<dyn ActivityHandler>,
    observer: Arc<dyn ClientObserver>,
    validator: Option<Arc<dyn ValidationEngine>>,
    config: ActivityWorkerConfig,
}

impl std::fmt::Debug for ActivityWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityWorker")
            .field("handler", &self.handler.handler_name())
            .field("dispatcher", &self.dispatcher)
            .field("has_validator", &self.validator.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ActivityWorker {
    pub fn new(
        client: Arc<dyn RemoteTaskClient>,
        dispatcher: Arc<NotificationDispatcher>,
        handler: Arc<dyn ActivityHandler>,
        mut config: ActivityWorkerConfig,
    ) -> Self {
        let minimum = config.minimum_network_timeout();
        if config.network_timeout < minimum {
            warn!(
                activity = %config.activity_name,
                configured_ms = config.network_timeout.as_millis() as u64,
                minimum_ms = minimum.as_millis() as u64,
                "Network timeout below long-poll margin; raising it"
            );
            config.network_timeout = minimum;
        }

        Self {
            client,
            dispatcher,
            handler,
            observer: Arc::new(NoopObserver),
            validator: None,
            config,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ClientObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ValidationEngine>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn config(&self) -> &ActivityWorkerConfig {
        &self.config
    }

    /// Run the loop until shutdown is requested.
    ///
    /// Shutdown is checked before each poll. Task failures, poll failures and
    /// report failures never end the loop.
    pub async fn run(&self, worker_identity: &str, shutdown: ShutdownSignal) -> WorkerStats {
        info!(
            activity = %self.config.activity_name,
            identity = %worker_identity,
            handler = self.handler.handler_name(),
            poll_timeout_seconds = self.config.poll_timeout.as_secs(),
            network_timeout_seconds = self.config.network_timeout.as_secs(),
            "Starting activity worker loop"
        );

        let mut stats = WorkerStats::default();

        while !shutdown.is_shutdown() {
            let outcome = self.run_once(worker_identity).await;
            stats.record(&outcome);

            let backoff = self.config.poll_error_backoff;
            if outcome == IterationOutcome::PollFailed && !backoff.is_zero() {
                tokio::time::sleep(backoff).await;
            }
        }

        info!(
            activity = %self.config.activity_name,
            identity = %worker_identity,
            polls = stats.polls,
            tasks_succeeded = stats.tasks_succeeded,
            tasks_failed = stats.tasks_failed,
            poll_errors = stats.poll_errors,
            report_errors = stats.report_errors,
            "Activity worker loop stopped"
        );
        stats
    }

    /// One poll and, if a task arrived, its full lifecycle
    pub async fn run_once(&self, worker_identity: &str) -> IterationOutcome {
        let request = PollRequest {
            identity: worker_identity.to_string(),
            domain: self.config.domain.clone(),
            task_list: self.config.task_list.clone(),
            poll_timeout: self.config.poll_timeout,
        };

        debug!(identity = %worker_identity, "Polling for activity task");

        let polled = match tokio::time::timeout(
            self.config.network_timeout,
            self.client.poll_task(&request),
        )
        .await
        {
            Ok(Ok(polled)) => polled,
            Ok(Err(e)) => {
                self.poll_failed(ActivityError::poll(e.to_string())).await;
                return IterationOutcome::PollFailed;
            }
            Err(_) => {
                self.poll_failed(ActivityError::poll(format!(
                    "poll did not complete within {}s",
                    self.config.network_timeout.as_secs()
                )))
                .await;
                return IterationOutcome::PollFailed;
            }
        };

        match polled.and_then(TaskHandle::from_polled) {
            Some(handle) => self.process_task(Arc::new(handle)).await,
            None => {
                debug!(identity = %worker_identity, "Empty poll");
                IterationOutcome::EmptyPoll
            }
        }
    }

    async fn poll_failed(&self, error: ActivityError) {
        error!(
            activity = %self.config.activity_name,
            error = %error,
            "Failed to poll for activity task"
        );
        guarded("on_exception", None, self.observer.on_exception(None, &error)).await;
    }

    async fn process_task(&self, handle: Arc<TaskHandle>) -> IterationOutcome {
        let log_key = handle.log_key();
        let mut machine = TaskStateMachine::new();

        info!(
            log_key = %log_key,
            activity_type = %handle.identity().activity_type.name,
            "Received activity task"
        );

        let outcome = match self.validate_and_dispatch(&handle, &mut machine).await {
            Ok(result) => self.report_success(&handle, &mut machine, result).await,
            Err(error) => self.report_failure(&handle, &mut machine, error).await,
        };

        handle.close();
        debug!(
            log_key = %log_key,
            state = %machine.current_state(),
            transitions = machine.history().len(),
            "Task lifecycle finished"
        );
        outcome
    }

    async fn validate_and_dispatch(
        &self,
        handle: &Arc<TaskHandle>,
        machine: &mut TaskStateMachine,
    ) -> Result<Value> {
        let log_key = handle.log_key();

        let input = validate_input(handle.raw_input())?;
        handle.set_input(input);
        advance(machine, TaskEvent::Validate, &log_key);

        guarded("on_start", Some(log_key.as_str()), self.observer.on_start(handle)).await;

        if let Err(e) = self.dispatcher.activity_started(handle).await {
            warn!(log_key = %log_key, error = %e, "ACTIVITY_STARTED notification not sent");
        }

        advance(machine, TaskEvent::Dispatch, &log_key);

        let context = ActivityContext::new(
            Arc::clone(handle),
            Arc::clone(&self.client),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.observer),
            self.validator.clone(),
        );

        let result = match AssertUnwindSafe(self.handler.process(&context))
            .catch_unwind()
            .await
        {
            Ok(result) => result?,
            Err(payload) => {
                return Err(ActivityError::processing(format!(
                    "activity handler panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }
        };

        Ok(normalize_result(result))
    }

    async fn report_success(
        &self,
        handle: &TaskHandle,
        machine: &mut TaskStateMachine,
        result: Value,
    ) -> IterationOutcome {
        let log_key = handle.log_key();
        advance(machine, TaskEvent::Succeed, &log_key);

        if let Err(e) = self.client.report_success(handle.token(), &result).await {
            let error = ActivityError::transport("report_success", e.to_string());
            self.report_call_failed(handle, error).await;
            return IterationOutcome::ReportFailed;
        }

        info!(log_key = %log_key, "Activity task succeeded");
        guarded(
            "on_success",
            Some(log_key.as_str()),
            self.observer.on_success(handle, &result),
        )
        .await;

        if let Err(e) = self.dispatcher.activity_completed(handle, &result).await {
            warn!(log_key = %log_key, error = %e, "ACTIVITY_COMPLETED notification not sent");
        }

        IterationOutcome::Succeeded
    }

    async fn report_failure(
        &self,
        handle: &TaskHandle,
        machine: &mut TaskStateMachine,
        error: ActivityError,
    ) -> IterationOutcome {
        let log_key = handle.log_key();
        let reason = error.code().to_string();
        let details = error.cause().to_string();
        advance(machine, TaskEvent::fail(reason.clone()), &log_key);

        warn!(
            log_key = %log_key,
            reason = %reason,
            details = %details,
            "Activity task failed"
        );

        if let Err(e) = self
            .client
            .report_failure(handle.token(), &reason, &details)
            .await
        {
            let error = ActivityError::transport("report_failure", e.to_string());
            self.report_call_failed(handle, error).await;
            return IterationOutcome::ReportFailed;
        }

        guarded(
            "on_fail",
            Some(log_key.as_str()),
            self.observer.on_fail(handle, &reason, &details),
        )
        .await;

        if let Err(e) = self
            .dispatcher
            .activity_failed(handle, &reason, &details)
            .await
        {
            warn!(log_key = %log_key, error = %e, "ACTIVITY_FAILED notification not sent");
        }

        IterationOutcome::Failed { code: reason }
    }

    /// The token is abandoned, never retried
    async fn report_call_failed(&self, handle: &TaskHandle, error: ActivityError) {
        let log_key = handle.log_key();
        error!(
            log_key = %log_key,
            error = %error,
            "Terminal report failed; abandoning task token"
        );
        guarded(
            "on_exception",
            Some(log_key.as_str()),
            self.observer.on_exception(Some(handle), &error),
        )
        .await;
    }
}

fn advance(machine: &mut TaskStateMachine, event: TaskEvent, log_key: &str) {
    if let Err(e) = machine.transition(event) {
        error!(log_key = %log_key, error = %e, "Unexpected task state transition");
    }
}

/// A `null` result is reported as an empty object
fn normalize_result(result: Value) -> Value {
    if result.is_null() {
        Value::Object(Map::new())
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_result_becomes_empty_object() {
        assert_eq!(normalize_result(Value::Null), json!({}));
        assert_eq!(normalize_result(json!("")), json!(""));
        assert_eq!(normalize_result(json!({"y": 2})), json!({"y": 2}));
    }

    #[test]
    fn test_stats_record_outcomes() {
        let mut stats = WorkerStats::default();
        for outcome in [
            IterationOutcome::EmptyPoll,
            IterationOutcome::PollFailed,
            IterationOutcome::Succeeded,
            IterationOutcome::Failed {
                code: "INPUT_INVALID".to_string(),
            },
            IterationOutcome::ReportFailed,
        ] {
            stats.record(&outcome);
        }
        assert_eq!(stats.polls, 5);
        assert_eq!(stats.empty_polls, 1);
        assert_eq!(stats.poll_errors, 1);
        assert_eq!(stats.tasks_processed(), 3);
    }

    #[test]
    fn test_config_from_worker_config() {
        let mut worker_config = WorkerConfig::for_activity("transcode", "1.0");
        worker_config.activity.domain = Some("media".to_string());
        worker_config.worker.poll_timeout_seconds = 20;
        worker_config.worker.network_timeout_seconds = 25;

        let config = ActivityWorkerConfig::from_worker_config(&worker_config);
        assert_eq!(config.activity_name, "transcode");
        assert_eq!(config.domain.as_deref(), Some("media"));
        assert_eq!(config.poll_timeout, Duration::from_secs(20));
        assert_eq!(config.network_timeout, Duration::from_secs(25));
        assert_eq!(config.minimum_network_timeout(), Duration::from_secs(25));
    }
}
