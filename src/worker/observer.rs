//! # Client Observer
//!
//! Optional callbacks around the task lifecycle. Every method has a no-op
//! default, and the worker isolates callback errors and panics from the loop.

use crate::error::ActivityError;
use crate::models::TaskHandle;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tracing::{error, warn};

/// Lifecycle callbacks
#[async_trait]
pub trait ClientObserver: Send + Sync {
    /// Input validated, processing about to start
    async fn on_start(&self, handle: &TaskHandle) -> anyhow::Result<()> {
        let _ = handle;
        Ok(())
    }

    /// Success reported to the orchestration service
    async fn on_success(&self, handle: &TaskHandle, result: &Value) -> anyhow::Result<()> {
        let _ = (handle, result);
        Ok(())
    }

    /// Failure reported to the orchestration service
    async fn on_fail(
        &self,
        handle: &TaskHandle,
        reason: &str,
        details: &str,
    ) -> anyhow::Result<()> {
        let _ = (handle, reason, details);
        Ok(())
    }

    /// Heartbeat acknowledged without a cancellation request
    async fn on_heartbeat(
        &self,
        handle: &TaskHandle,
        details: Option<&Value>,
    ) -> anyhow::Result<()> {
        let _ = (handle, details);
        Ok(())
    }

    /// Poll or report failure. `handle` is `None` for poll failures.
    async fn on_exception(
        &self,
        handle: Option<&TaskHandle>,
        error: &ActivityError,
    ) -> anyhow::Result<()> {
        let _ = (handle, error);
        Ok(())
    }
}

/// Observer that ignores every callback
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl ClientObserver for NoopObserver {}

/// Run one observer callback, logging instead of propagating its failure
pub(crate) async fn guarded<F>(callback: &'static str, log_key: Option<&str>, callback_future: F)
where
    F: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(callback_future).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            warn!(callback = callback, log_key = log_key, error = %e, "Observer callback failed");
        }
        Err(payload) => {
            error!(
                callback = callback,
                log_key = log_key,
                panic = %panic_message(payload.as_ref()),
                "Observer callback panicked"
            );
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingObserver;

    #[async_trait]
    impl ClientObserver for PanickingObserver {
        async fn on_start(&self, _handle: &TaskHandle) -> anyhow::Result<()> {
            panic!("observer bug");
        }

        async fn on_exception(
            &self,
            _handle: Option<&TaskHandle>,
            _error: &ActivityError,
        ) -> anyhow::Result<()> {
            anyhow::bail!("observer unavailable")
        }
    }

    #[tokio::test]
    async fn test_guarded_contains_errors_and_panics() {
        let observer = PanickingObserver;
        let handle = TaskHandle::from_polled(crate::models::PolledTask {
            task_token: "t".to_string(),
            ..Default::default()
        })
        .unwrap();

        guarded("on_start", None, observer.on_start(&handle)).await;
        guarded(
            "on_exception",
            Some("wf:act"),
            observer.on_exception(None, &ActivityError::poll("down")),
        )
        .await;
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
