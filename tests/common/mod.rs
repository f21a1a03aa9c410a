//! Shared mocks for worker integration tests.
//!
//! Every mock writes into one [`CallLog`] so tests can assert the relative
//! order of client calls, observer callbacks, notifications and handler runs.

#![allow(dead_code)]

use activity_worker::client::{
    ClientError, ClientResult, HeartbeatAck, PollRequest, RemoteTaskClient,
};
use activity_worker::error::{ActivityError, Result};
use activity_worker::messaging::{
    MessagingError, MessagingResult, NotificationDispatcher, NotificationTransport,
};
use activity_worker::models::{ActivityType, PolledTask, TaskHandle, WorkflowExecution};
use activity_worker::worker::{
    ActivityContext, ActivityHandler, ActivityWorker, ActivityWorkerConfig, ClientObserver,
    ShutdownHandle,
};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const OUTPUT_QUEUE: &str = "client-out";

/// One observable interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Poll { identity: String },
    Heartbeat { token: String, details: Option<Value> },
    ReportSuccess { token: String, result: Value },
    ReportFailure { token: String, reason: String, details: String },
    OnStart { token: String },
    OnSuccess { result: Value },
    OnFail { reason: String, details: String },
    OnHeartbeat,
    OnException { code: String, with_handle: bool },
    Process { input: Value },
    Notify { queue: String, event: String, message: Value },
    NotifyFailed { event: String },
}

#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Calls other than polls
    pub fn without_polls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, Call::Poll { .. }))
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    pub fn terminal_reports(&self) -> usize {
        self.count(|call| matches!(call, Call::ReportSuccess { .. } | Call::ReportFailure { .. }))
    }

    pub fn notified_events(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Notify { event, .. } => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn notification(&self, event_name: &str) -> Option<Value> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Notify { event, message, .. } if event == event_name => Some(message),
            _ => None,
        })
    }
}

/// Scripted poll response
#[derive(Debug, Clone)]
pub enum PollScript {
    Task(PolledTask),
    Empty,
    Error(String),
    /// Never answers within any reasonable network timeout
    Hang,
}

/// Scripted heartbeat response
#[derive(Debug, Clone, Copy)]
pub enum HeartbeatScript {
    Ack,
    Cancel,
    Error,
}

/// Scripted orchestration service
pub struct MockTaskClient {
    log: CallLog,
    polls: Mutex<VecDeque<PollScript>>,
    heartbeats: Mutex<VecDeque<HeartbeatScript>>,
    fail_reports: bool,
    shutdown_when_exhausted: Option<ShutdownHandle>,
}

impl MockTaskClient {
    pub fn new(log: CallLog, polls: Vec<PollScript>) -> Self {
        Self {
            log,
            polls: Mutex::new(polls.into()),
            heartbeats: Mutex::new(VecDeque::new()),
            fail_reports: false,
            shutdown_when_exhausted: None,
        }
    }

    pub fn with_heartbeats(self, heartbeats: Vec<HeartbeatScript>) -> Self {
        *self.heartbeats.lock().unwrap() = heartbeats.into();
        self
    }

    /// Both terminal report calls fail on the wire
    pub fn with_failing_reports(mut self) -> Self {
        self.fail_reports = true;
        self
    }

    /// Request shutdown once every scripted poll has been served
    pub fn with_shutdown_when_exhausted(mut self, handle: ShutdownHandle) -> Self {
        self.shutdown_when_exhausted = Some(handle);
        self
    }
}

#[async_trait]
impl RemoteTaskClient for MockTaskClient {
    async fn poll_task(&self, request: &PollRequest) -> ClientResult<Option<PolledTask>> {
        self.log.push(Call::Poll {
            identity: request.identity.clone(),
        });

        let next = {
            let mut polls = self.polls.lock().unwrap();
            let next = polls.pop_front();
            if polls.is_empty() {
                if let Some(handle) = &self.shutdown_when_exhausted {
                    handle.shutdown();
                }
            }
            next
        };

        match next {
            Some(PollScript::Task(task)) => Ok(Some(task)),
            Some(PollScript::Empty) | None => Ok(None),
            Some(PollScript::Error(message)) => Err(ClientError::request("poll_task", message)),
            Some(PollScript::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(None)
            }
        }
    }

    async fn heartbeat(&self, token: &str, details: Option<&Value>) -> ClientResult<HeartbeatAck> {
        self.log.push(Call::Heartbeat {
            token: token.to_string(),
            details: details.cloned(),
        });

        let script = self
            .heartbeats
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(HeartbeatScript::Ack);

        match script {
            HeartbeatScript::Ack => Ok(HeartbeatAck::default()),
            HeartbeatScript::Cancel => Ok(HeartbeatAck {
                cancel_requested: true,
            }),
            HeartbeatScript::Error => Err(ClientError::request("heartbeat", "connection reset")),
        }
    }

    async fn report_success(&self, token: &str, result: &Value) -> ClientResult<()> {
        self.log.push(Call::ReportSuccess {
            token: token.to_string(),
            result: result.clone(),
        });
        if self.fail_reports {
            return Err(ClientError::Status {
                operation: "report_success".to_string(),
                status: 500,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }

    async fn report_failure(&self, token: &str, reason: &str, details: &str) -> ClientResult<()> {
        self.log.push(Call::ReportFailure {
            token: token.to_string(),
            reason: reason.to_string(),
            details: details.to_string(),
        });
        if self.fail_reports {
            return Err(ClientError::timeout("report_failure", 30));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendBehavior {
    Deliver,
    Fail,
    Stall,
}

/// Notification transport that records deliveries, fails every send, or never
/// answers
pub struct RecordingTransport {
    log: CallLog,
    behavior: SendBehavior,
}

impl RecordingTransport {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            behavior: SendBehavior::Deliver,
        }
    }

    pub fn failing(log: CallLog) -> Self {
        Self {
            log,
            behavior: SendBehavior::Fail,
        }
    }

    /// Every send hangs for an hour
    pub fn stalled(log: CallLog) -> Self {
        Self {
            log,
            behavior: SendBehavior::Stall,
        }
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, queue_name: &str, message: &str) -> MessagingResult<()> {
        let message: Value = serde_json::from_str(message)?;
        let event = message["type"].as_str().unwrap_or_default().to_string();

        match self.behavior {
            SendBehavior::Deliver => {}
            SendBehavior::Fail => {
                self.log.push(Call::NotifyFailed { event });
                return Err(MessagingError::queue_operation(
                    queue_name,
                    "send",
                    "queue unavailable",
                ));
            }
            SendBehavior::Stall => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }

        self.log.push(Call::Notify {
            queue: queue_name.to_string(),
            event,
            message,
        });
        Ok(())
    }
}

/// Observer that records callbacks and can misbehave on demand
pub struct RecordingObserver {
    log: CallLog,
    fail_callbacks: bool,
    panic_callbacks: bool,
}

impl RecordingObserver {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            fail_callbacks: false,
            panic_callbacks: false,
        }
    }

    /// Every callback records its call, then returns an error
    pub fn failing(log: CallLog) -> Self {
        Self {
            fail_callbacks: true,
            ..Self::new(log)
        }
    }

    /// Every callback records its call, then panics
    pub fn panicking(log: CallLog) -> Self {
        Self {
            panic_callbacks: true,
            ..Self::new(log)
        }
    }

    fn finish(&self, callback: &str) -> anyhow::Result<()> {
        if self.panic_callbacks {
            panic!("{callback} exploded");
        }
        if self.fail_callbacks {
            anyhow::bail!("{callback} failed");
        }
        Ok(())
    }
}

#[async_trait]
impl ClientObserver for RecordingObserver {
    async fn on_start(&self, handle: &TaskHandle) -> anyhow::Result<()> {
        self.log.push(Call::OnStart {
            token: handle.token().to_string(),
        });
        self.finish("on_start")
    }

    async fn on_success(&self, _handle: &TaskHandle, result: &Value) -> anyhow::Result<()> {
        self.log.push(Call::OnSuccess {
            result: result.clone(),
        });
        self.finish("on_success")
    }

    async fn on_fail(
        &self,
        _handle: &TaskHandle,
        reason: &str,
        details: &str,
    ) -> anyhow::Result<()> {
        self.log.push(Call::OnFail {
            reason: reason.to_string(),
            details: details.to_string(),
        });
        self.finish("on_fail")
    }

    async fn on_heartbeat(
        &self,
        _handle: &TaskHandle,
        _details: Option<&Value>,
    ) -> anyhow::Result<()> {
        self.log.push(Call::OnHeartbeat);
        self.finish("on_heartbeat")
    }

    async fn on_exception(
        &self,
        handle: Option<&TaskHandle>,
        error: &ActivityError,
    ) -> anyhow::Result<()> {
        self.log.push(Call::OnException {
            code: error.code().to_string(),
            with_handle: handle.is_some(),
        });
        self.finish("on_exception")
    }
}

type ProcessFn = dyn Fn(ActivityContext) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// Handler built from a closure; records every invocation
pub struct FnHandler {
    log: CallLog,
    process: Box<ProcessFn>,
}

impl FnHandler {
    pub fn new<F>(log: CallLog, process: F) -> Self
    where
        F: Fn(ActivityContext) -> BoxFuture<'static, Result<Value>> + Send + Sync + 'static,
    {
        Self {
            log,
            process: Box::new(process),
        }
    }

    /// Handler that always returns `result`
    pub fn returning(log: CallLog, result: Value) -> Self {
        Self::new(log, move |_context| {
            let result = result.clone();
            async move { Ok(result) }.boxed()
        })
    }

    /// Handler that always fails with `error`
    pub fn failing(log: CallLog, error: ActivityError) -> Self {
        Self::new(log, move |_context| {
            let error = error.clone();
            async move { Err(error) }.boxed()
        })
    }
}

#[async_trait]
impl ActivityHandler for FnHandler {
    async fn process(&self, context: &ActivityContext) -> Result<Value> {
        self.log.push(Call::Process {
            input: context.input().clone(),
        });
        (self.process)(context.clone()).await
    }
}

pub fn test_config() -> ActivityWorkerConfig {
    ActivityWorkerConfig {
        activity_name: "transcode".to_string(),
        domain: Some("media".to_string()),
        task_list: None,
        poll_timeout: Duration::from_secs(1),
        network_timeout: Duration::from_secs(6),
        poll_error_backoff: Duration::ZERO,
    }
}

/// Worker wired to the given mocks with a recording observer
pub fn build_worker(
    log: &CallLog,
    client: MockTaskClient,
    handler: FnHandler,
) -> ActivityWorker {
    build_worker_with(
        client,
        RecordingTransport::new(log.clone()),
        RecordingObserver::new(log.clone()),
        handler,
    )
}

pub fn build_worker_with(
    client: MockTaskClient,
    transport: RecordingTransport,
    observer: RecordingObserver,
    handler: FnHandler,
) -> ActivityWorker {
    ActivityWorker::new(
        Arc::new(client),
        Arc::new(NotificationDispatcher::new(Arc::new(transport))),
        Arc::new(handler),
        test_config(),
    )
    .with_observer(Arc::new(observer))
}

/// Task input naming the test output queue, merged with `fields`
pub fn input_with_queue(fields: Value) -> String {
    let mut input = json!({"client": {"queues": {"output": OUTPUT_QUEUE}}});
    if let (Some(target), Some(source)) = (input.as_object_mut(), fields.as_object()) {
        for (key, value) in source {
            target.insert(key.clone(), value.clone());
        }
    }
    input.to_string()
}

pub fn polled_task(token: &str, input: Option<&str>) -> PolledTask {
    PolledTask {
        task_token: token.to_string(),
        activity_id: format!("act-{token}"),
        activity_type: ActivityType {
            name: "transcode".to_string(),
            version: "1.0".to_string(),
        },
        workflow_execution: WorkflowExecution {
            workflow_id: "wf-1".to_string(),
            run_id: "run-1".to_string(),
        },
        input: input.map(str::to_string),
    }
}
