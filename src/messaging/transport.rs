//! Notification transport contracts and the in-memory implementation used by
//! tests and local runs.
//!
//! [`NotificationTransport`] is the worker's write side. Client applications
//! consume their output queue through [`NotificationListener`]: receive one
//! message, handle it, then delete it.

use super::errors::{MessagingError, MessagingResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;

/// Delivers one serialized message to a named queue
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, queue_name: &str, message: &str) -> MessagingResult<()>;
}

/// A message read from a client output queue
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub msg_id: i64,
    pub body: Value,
}

/// Reads status messages from a client output queue
#[async_trait]
pub trait NotificationListener: Send + Sync {
    /// Wait up to `wait` for one message. `None` when the queue stayed empty.
    async fn receive_message(
        &self,
        queue_name: &str,
        wait: Duration,
    ) -> MessagingResult<Option<ReceivedMessage>>;

    /// Acknowledge a received message so it is never delivered again
    async fn delete_message(&self, queue_name: &str, message: &ReceivedMessage)
        -> MessagingResult<()>;
}

#[derive(Debug, Default)]
struct QueueState {
    sent: Vec<(String, String)>,
    pending: HashMap<String, VecDeque<ReceivedMessage>>,
    in_flight: HashSet<(String, i64)>,
    next_id: i64,
}

/// Transport that keeps messages in process memory.
///
/// Every send is also kept in a log for assertions, so this is not meant for
/// long-running workers.
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    state: Mutex<QueueState>,
    arrivals: Notify,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(queue, message)` pairs in send order
    pub fn messages(&self) -> Vec<(String, String)> {
        self.state.lock().sent.clone()
    }

    pub fn messages_for(&self, queue_name: &str) -> Vec<String> {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|(queue, _)| queue == queue_name)
            .map(|(_, message)| message.clone())
            .collect()
    }

    fn take_next(&self, queue_name: &str) -> Option<ReceivedMessage> {
        let mut state = self.state.lock();
        let message = state.pending.get_mut(queue_name)?.pop_front()?;
        state
            .in_flight
            .insert((queue_name.to_string(), message.msg_id));
        Some(message)
    }
}

#[async_trait]
impl NotificationTransport for InMemoryTransport {
    async fn send(&self, queue_name: &str, message: &str) -> MessagingResult<()> {
        let body: Value = serde_json::from_str(message)?;
        {
            let mut state = self.state.lock();
            state.next_id += 1;
            let msg_id = state.next_id;
            state
                .sent
                .push((queue_name.to_string(), message.to_string()));
            state
                .pending
                .entry(queue_name.to_string())
                .or_default()
                .push_back(ReceivedMessage { msg_id, body });
        }
        self.arrivals.notify_waiters();
        Ok(())
    }
}

#[async_trait]
impl NotificationListener for InMemoryTransport {
    async fn receive_message(
        &self,
        queue_name: &str,
        wait: Duration,
    ) -> MessagingResult<Option<ReceivedMessage>> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Registered before the check so a send in between is not missed
            let arrival = self.arrivals.notified();
            if let Some(message) = self.take_next(queue_name) {
                return Ok(Some(message));
            }
            if tokio::time::timeout_at(deadline, arrival).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn delete_message(
        &self,
        queue_name: &str,
        message: &ReceivedMessage,
    ) -> MessagingResult<()> {
        let removed = self
            .state
            .lock()
            .in_flight
            .remove(&(queue_name.to_string(), message.msg_id));
        if !removed {
            return Err(MessagingError::queue_operation(
                queue_name,
                "delete",
                format!("message {} is not in flight", message.msg_id),
            ));
        }
        Ok(())
    }
}
