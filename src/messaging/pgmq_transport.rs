//! # PGMQ Notification Transport
//!
//! Sends notification messages to PostgreSQL message queues through the
//! `pgmq` extension functions, and reads them back for client applications.

use super::errors::{MessagingError, MessagingResult};
use super::transport::{NotificationListener, NotificationTransport, ReceivedMessage};
use crate::constants::timing;
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// [`NotificationTransport`] and [`NotificationListener`] over pgmq
#[derive(Debug, Clone)]
pub struct PgmqNotificationTransport {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgmqNotificationTransport {
    /// Connect to the database hosting the queues
    pub async fn new(database_url: &str) -> MessagingResult<Self> {
        info!("Connecting notification transport to pgmq");

        let pool = Self::pool_options()
            .connect(database_url)
            .await
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;

        Ok(Self::new_with_pool(pool))
    }

    /// Build the pool without connecting; connections are opened on first use
    pub fn connect_lazy(database_url: &str) -> MessagingResult<Self> {
        let pool = Self::pool_options()
            .connect_lazy(database_url)
            .map_err(|e| MessagingError::database_connection(e.to_string()))?;

        Ok(Self::new_with_pool(pool))
    }

    /// Reuse an existing connection pool
    pub fn new_with_pool(pool: PgPool) -> Self {
        Self {
            pool,
            visibility_timeout: Duration::from_secs(timing::DEFAULT_VISIBILITY_TIMEOUT_SECS),
        }
    }

    /// How long a received message stays hidden from other readers
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    fn pool_options() -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(
                timing::NOTIFICATION_POOL_ACQUIRE_TIMEOUT_SECS,
            ))
    }

    /// Create a queue if it does not already exist
    pub async fn create_queue(&self, queue_name: &str) -> MessagingResult<()> {
        sqlx::query("SELECT pgmq.create($1)")
            .bind(queue_name)
            .execute(&self.pool)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))?;

        info!(queue = %queue_name, "Queue created");
        Ok(())
    }
}

fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

#[async_trait]
impl NotificationTransport for PgmqNotificationTransport {
    #[instrument(skip(self, message), fields(queue = %queue_name))]
    async fn send(&self, queue_name: &str, message: &str) -> MessagingResult<()> {
        let payload: serde_json::Value = serde_json::from_str(message)?;

        let message_id = sqlx::query_scalar::<_, i64>("SELECT pgmq.send($1, $2)")
            .bind(queue_name)
            .bind(&payload)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;

        debug!(message_id = message_id, "Notification sent");
        Ok(())
    }
}

#[async_trait]
impl NotificationListener for PgmqNotificationTransport {
    #[instrument(skip(self), fields(queue = %queue_name))]
    async fn receive_message(
        &self,
        queue_name: &str,
        wait: Duration,
    ) -> MessagingResult<Option<ReceivedMessage>> {
        let row = sqlx::query_as::<_, (i64, serde_json::Value)>(
            "SELECT msg_id, message FROM pgmq.read_with_poll($1, $2, 1, $3)",
        )
        .bind(queue_name)
        .bind(whole_seconds(self.visibility_timeout))
        .bind(whole_seconds(wait))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?;

        Ok(row.map(|(msg_id, body)| {
            debug!(message_id = msg_id, "Notification received");
            ReceivedMessage { msg_id, body }
        }))
    }

    #[instrument(skip(self, message), fields(queue = %queue_name, message_id = message.msg_id))]
    async fn delete_message(
        &self,
        queue_name: &str,
        message: &ReceivedMessage,
    ) -> MessagingResult<()> {
        let deleted = sqlx::query_scalar::<_, bool>("SELECT pgmq.delete($1, $2::bigint)")
            .bind(queue_name)
            .bind(message.msg_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;

        if !deleted {
            return Err(MessagingError::queue_operation(
                queue_name,
                "delete",
                format!("message {} not found", message.msg_id),
            ));
        }
        Ok(())
    }
}
