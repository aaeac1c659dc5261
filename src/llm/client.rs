use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::types::{MessagesRequest, MessagesResponse};
use super::LlmGateway;
use crate::config::{LlmConfig, RequestConfig};
use crate::error::{LlmError, LlmResult};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(config: &LlmConfig, request_config: RequestConfig) -> LlmResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(LlmError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Send a messages request, retrying with exponential backoff
    pub async fn send(&self, request: MessagesRequest) -> LlmResult<MessagesResponse> {
        let url = format!("{}/v1/messages", self.base_url);

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = self.request_config.backoff(retries);
                warn!(
                    model = %self.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Anthropic request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(response) => {
                    info!(
                        model = %self.model,
                        max_tokens = request.max_tokens,
                        latency_ms = start.elapsed().as_millis(),
                        "Completion succeeded"
                    );
                    return Ok(response);
                }
                Err(e) if is_permanent(&e) => {
                    error!(model = %self.model, error = %e, "Completion rejected");
                    return Err(e);
                }
                Err(e) => {
                    error!(
                        model = %self.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Completion failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(LlmError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &MessagesRequest,
    ) -> LlmResult<MessagesResponse> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Calling Anthropic messages API"
        );

        let response = self
            .client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    LlmError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the configured model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Client errors other than rate limiting will not improve on retry.
fn is_permanent(err: &LlmError) -> bool {
    matches!(err, LlmError::Api { status, .. } if (400..500).contains(status) && *status != 429)
}

#[async_trait]
impl LlmGateway for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> LlmResult<String> {
        let request = MessagesRequest::single_turn(&self.model, prompt, max_tokens);
        let response = self.send(request).await?;

        response
            .first_text()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "Response contained no text content".to_string(),
            })
    }
}
