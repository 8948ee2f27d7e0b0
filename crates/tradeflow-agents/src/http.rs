use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use tradeflow_models::HealthStatus;

use crate::error::AgentError;

/// JSON-over-HTTP plumbing shared by the collaborator clients.
///
/// Transport failures (refused, reset, timed out) become
/// `UpstreamUnavailable`; non-2xx statuses become `UpstreamError`; bodies that
/// are not JSON become `InvalidResponse`. Nothing is retried.
pub(crate) struct ServiceClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
    health_timeout: Duration,
}

impl ServiceClient {
    pub(crate) fn new(
        service: &'static str,
        base_url: &str,
        request_timeout: Duration,
        health_timeout: Duration,
    ) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| AgentError::Config(format!("{service} HTTP client: {e}")))?;

        Ok(Self {
            service,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            health_timeout,
        })
    }

    pub(crate) fn service(&self) -> &'static str {
        self.service
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<serde_json::Value, AgentError> {
        let url = self.url(path);
        debug!(service = self.service, url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::unavailable(self.service, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AgentError::unavailable(self.service, e.to_string()))?;

        if !status.is_success() {
            warn!(service = self.service, status = status.as_u16(), "Upstream returned error status");
            return Err(AgentError::UpstreamError {
                service: self.service.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| AgentError::invalid_response(self.service, format!("not JSON: {e}")))
    }

    /// Probe `GET /health`.
    pub(crate) async fn health(&self) -> HealthStatus {
        match self
            .http
            .get(self.url("/health"))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => HealthStatus::Healthy,
            Ok(response) => {
                debug!(service = self.service, status = response.status().as_u16(), "Unhealthy");
                HealthStatus::Unhealthy
            }
            Err(e) => {
                debug!(service = self.service, error = %e, "Unreachable");
                HealthStatus::Unreachable
            }
        }
    }
}
