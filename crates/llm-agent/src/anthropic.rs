use async_trait::async_trait;
use reqwest::Client;

use crate::retry::{with_retry, RetryPolicy};
use crate::types::{ChatMessage, MessagesRequest, MessagesResponse};
use crate::{GenerationError, Generator};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider for the Anthropic messages API.
#[derive(Clone)]
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f32>,
    retry: RetryPolicy,
}

impl AnthropicProvider {
    pub fn new(
        api_key: String,
        model: &str,
        max_tokens: u32,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(retry.timeout())
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: ANTHROPIC_API_URL.to_string(),
            api_key,
            model: model.to_string(),
            max_tokens,
            temperature: None,
            retry,
        })
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    async fn invoke_once(&self, request: &MessagesRequest) -> Result<String, GenerationError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        let text = parsed.text();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl Generator for AnthropicProvider {
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
        };
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "invoking messages API");
        with_retry(&self.retry, || self.invoke_once(&request)).await
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
