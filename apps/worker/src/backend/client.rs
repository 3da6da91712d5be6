/// Backend API client — the single point of entry for talking to the
/// external hiring-platform backend (jobs, resumes, scores).
///
/// ARCHITECTURAL RULE: No other module may issue an HTTP request against
/// the backend directly. All reads and writes go through this module.
use anyhow::Result;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::models::Envelope;
use crate::errors::PipelineError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_RETRIES: u32 = 3;
const RETRYABLE_STATUSES: [u16; 4] = [429, 502, 503, 504];

/// Thin client wrapping the backend's `{success, data, error}` envelope
/// with retry on 429/5xx and bearer-token auth.
#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl BackendClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
                .build()
                .expect("failed to build HTTP client"),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PipelineError> {
        self.request(Method::GET, endpoint, None::<&()>).await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, PipelineError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, PipelineError> {
        self.request(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn patch<B: Serialize, T: DeserializeOwned>(&self, endpoint: &str, body: &B) -> Result<T, PipelineError> {
        self.request(Method::PATCH, endpoint, Some(body)).await
    }

    async fn request<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, PipelineError> {
        let url = self.url(endpoint);
        let mut last_error: Option<PipelineError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
            }

            debug!("{} {}", method, url);
            let mut request = self.client.request(method.clone(), &url).header("Content-Type", "application/json");
            if !self.api_key.is_empty() {
                request = request.bearer_auth(&self.api_key);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = match request.send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(PipelineError::UpstreamTransient(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if RETRYABLE_STATUSES.contains(&status.as_u16()) {
                let text = response.text().await.unwrap_or_default();
                last_error = Some(PipelineError::UpstreamTransient(format!("{status}: {text}")));
                continue;
            }

            let text = response
                .text()
                .await
                .map_err(|e| PipelineError::UpstreamTransient(e.to_string()))?;

            if !status.is_success() {
                let message = serde_json::from_str::<Envelope<serde_json::Value>>(&text)
                    .ok()
                    .and_then(|e| e.error)
                    .unwrap_or(text);
                return Err(PipelineError::Api {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                    message,
                });
            }

            return parse_envelope(&text, endpoint);
        }

        Err(last_error.unwrap_or_else(|| PipelineError::UpstreamTransient(format!("{endpoint} exhausted retries"))))
    }
}

/// Parses a backend response body. Mirrors the legacy client's
/// `{success, data, error}` unwrap, falling back to treating the whole
/// body as the data payload when it isn't wrapped in the envelope shape.
fn parse_envelope<T: DeserializeOwned>(text: &str, endpoint: &str) -> Result<T, PipelineError> {
    if let Ok(envelope) = serde_json::from_str::<Envelope<T>>(text) {
        if !envelope.success {
            return Err(PipelineError::Api {
                endpoint: endpoint.to_string(),
                status: 200,
                message: envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        if let Some(data) = envelope.data {
            return Ok(data);
        }
    }

    serde_json::from_str(text).map_err(|e| PipelineError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Job {
        id: String,
    }

    #[tokio::test]
    async fn get_unwraps_success_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {"id": "abc"}
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri(), "test-key".to_string());
        let job: Job = client.get("/jobs/abc").await.unwrap();
        assert_eq!(job.id, "abc");
    }

    #[tokio::test]
    async fn get_surfaces_success_false_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/missing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "error": "job not found"
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri(), "test-key".to_string());
        let result: Result<Job, PipelineError> = client.get("/jobs/missing").await;
        assert!(matches!(result, Err(PipelineError::Api { .. })));
    }

    #[tokio::test]
    async fn retries_on_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jobs/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "data": {"id": "flaky"}
            })))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri(), "test-key".to_string());
        let job: Job = client.get("/jobs/flaky").await.unwrap();
        assert_eq!(job.id, "flaky");
    }

    #[tokio::test]
    async fn returns_api_error_on_non_retryable_4xx() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/forbidden"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = BackendClient::new(server.uri(), "test-key".to_string());
        let result: Result<Job, PipelineError> = client.get("/jobs/forbidden").await;
        match result {
            Err(PipelineError::Api { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
