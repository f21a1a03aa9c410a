//! # Orchestration HTTP Client
//!
//! [`RemoteTaskClient`] over the orchestration service's JSON API:
//!
//! - `POST /v1/activity-tasks/poll` → `200` with a task, or `204` when empty
//! - `POST /v1/activity-tasks/heartbeat` → `{"cancelRequested": bool}`
//! - `POST /v1/activity-tasks/complete`
//! - `POST /v1/activity-tasks/fail`
//!
//! Calls are attempted once. Terminal reports are never retried because a
//! retried token may already be expired or reassigned.

use super::{ClientError, ClientResult, HeartbeatAck, PollRequest, RemoteTaskClient};
use crate::config::{OrchestrationConfig, PollingConfig};
use crate::models::PolledTask;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Configuration for [`HttpTaskClient`]
#[derive(Debug, Clone)]
pub struct HttpTaskClientConfig {
    /// Base URL of the orchestration API (e.g. `http://orchestration:8080`)
    pub base_url: String,
    pub auth_token: Option<String>,
    /// Timeout for heartbeat and report calls
    pub request_timeout: Duration,
    /// Local timeout for the long-poll call; exceeds the server poll timeout
    pub poll_network_timeout: Duration,
}

impl Default for HttpTaskClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            auth_token: None,
            request_timeout: Duration::from_secs(30),
            poll_network_timeout: Duration::from_secs(70),
        }
    }
}

impl HttpTaskClientConfig {
    pub fn from_worker_config(
        orchestration: &OrchestrationConfig,
        polling: &PollingConfig,
    ) -> Self {
        Self {
            base_url: orchestration.base_url.clone(),
            auth_token: orchestration.auth_token.clone(),
            poll_network_timeout: polling.network_timeout(),
            ..Default::default()
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PollBody<'a> {
    identity: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_list: Option<&'a str>,
    poll_timeout_seconds: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HeartbeatBody<'a> {
    task_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CompleteBody<'a> {
    task_token: &'a str,
    result: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FailBody<'a> {
    task_token: &'a str,
    reason: &'a str,
    details: &'a str,
}

/// HTTP client for the orchestration service
#[derive(Debug, Clone)]
pub struct HttpTaskClient {
    client: Client,
    config: HttpTaskClientConfig,
    base_url: Url,
}

impl HttpTaskClient {
    pub fn new(config: HttpTaskClientConfig) -> ClientResult<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::configuration(format!("Invalid base URL: {e}")))?;

        let mut client_builder =
            Client::builder().user_agent(format!("activity-worker/{}", env!("CARGO_PKG_VERSION")));

        if let Some(ref token) = config.auth_token {
            let mut default_headers = reqwest::header::HeaderMap::new();
            default_headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {token}")
                    .parse()
                    .map_err(|e| ClientError::configuration(format!("Invalid auth token: {e}")))?,
            );
            client_builder = client_builder.default_headers(default_headers);
        }

        let client = client_builder
            .build()
            .map_err(|e| ClientError::configuration(format!("Failed to create HTTP client: {e}")))?;

        info!(
            base_url = %config.base_url,
            poll_network_timeout_seconds = config.poll_network_timeout.as_secs(),
            auth_enabled = config.auth_token.is_some(),
            "Created orchestration task client"
        );

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn endpoint(&self, operation: &str, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::protocol(operation, format!("Failed to construct URL: {e}")))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        operation: &str,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> ClientResult<reqwest::Response> {
        let url = self.endpoint(operation, path)?;
        debug!(url = %url, operation = %operation, "Calling orchestration service");

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::timeout(operation, timeout.as_secs())
                } else {
                    ClientError::request(operation, e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ClientError::Status {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl RemoteTaskClient for HttpTaskClient {
    async fn poll_task(&self, request: &PollRequest) -> ClientResult<Option<PolledTask>> {
        let body = PollBody {
            identity: &request.identity,
            domain: request.domain.as_deref(),
            task_list: request.task_list.as_deref(),
            poll_timeout_seconds: request.poll_timeout.as_secs(),
        };

        let response = self
            .post(
                "poll_task",
                "/v1/activity-tasks/poll",
                &body,
                self.config.poll_network_timeout,
            )
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let task = response
            .json::<PolledTask>()
            .await
            .map_err(|e| ClientError::protocol("poll_task", format!("Invalid task payload: {e}")))?;

        if task.task_token.is_empty() {
            return Ok(None);
        }
        Ok(Some(task))
    }

    async fn heartbeat(&self, token: &str, details: Option<&Value>) -> ClientResult<HeartbeatAck> {
        let body = HeartbeatBody {
            task_token: token,
            details,
        };

        let response = self
            .post(
                "heartbeat",
                "/v1/activity-tasks/heartbeat",
                &body,
                self.config.request_timeout,
            )
            .await?;

        response
            .json::<HeartbeatAck>()
            .await
            .map_err(|e| ClientError::protocol("heartbeat", format!("Invalid acknowledgment: {e}")))
    }

    async fn report_success(&self, token: &str, result: &Value) -> ClientResult<()> {
        let body = CompleteBody {
            task_token: token,
            result,
        };
        self.post(
            "report_success",
            "/v1/activity-tasks/complete",
            &body,
            self.config.request_timeout,
        )
        .await?;
        Ok(())
    }

    async fn report_failure(&self, token: &str, reason: &str, details: &str) -> ClientResult<()> {
        let body = FailBody {
            task_token: token,
            reason,
            details,
        };
        self.post(
            "report_failure",
            "/v1/activity-tasks/fail",
            &body,
            self.config.request_timeout,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = HttpTaskClientConfig {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTaskClient::new(config),
            Err(ClientError::Configuration { .. })
        ));
    }

    #[test]
    fn test_config_from_worker_config_uses_network_timeout() {
        let orchestration = OrchestrationConfig {
            base_url: "http://orchestrator:9000".to_string(),
            auth_token: Some("t".to_string()),
            region: None,
        };
        let polling = PollingConfig {
            poll_timeout_seconds: 20,
            network_timeout_seconds: 25,
            ..Default::default()
        };
        let config = HttpTaskClientConfig::from_worker_config(&orchestration, &polling);
        assert_eq!(config.poll_network_timeout, Duration::from_secs(25));
        assert_eq!(config.base_url, "http://orchestrator:9000");
    }
}
