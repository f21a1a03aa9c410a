//! # Messaging Module
//!
//! Structured status notifications sent to client applications through an
//! external queue. The queue is named by the task input itself
//! (`client.queues.output`), so no out-of-band configuration is needed.
//! Notification is best effort and secondary to the report made to the
//! orchestration service. Client applications read their queue back through
//! [`NotificationListener`].

pub mod dispatcher;
pub mod errors;
pub mod message;
#[cfg(feature = "postgres")]
pub mod pgmq_transport;
pub mod transport;

pub use dispatcher::NotificationDispatcher;
pub use errors::{MessagingError, MessagingResult};
pub use message::{ActivityExtra, EventType, NotificationMessage, WorkflowScheduled};
#[cfg(feature = "postgres")]
pub use pgmq_transport::PgmqNotificationTransport;
pub use transport::{
    InMemoryTransport, NotificationListener, NotificationTransport, ReceivedMessage,
};
