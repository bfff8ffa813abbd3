use async_trait::async_trait;
use reqwest::Client;

use crate::retry::{with_retry, RetryPolicy};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};
use crate::{GenerationError, Generator};

/// Provider for endpoints implementing `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    retry: RetryPolicy,
    name: String,
}

impl OpenAiCompatProvider {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        retry: RetryPolicy,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(retry.timeout())
            .build()
            .map_err(|e| GenerationError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            temperature: None,
            max_tokens: None,
            retry,
            name: "openai_compatible".to_string(),
        })
    }

    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn invoke_once(&self, request: &ChatRequest) -> Result<String, GenerationError> {
        let mut builder = self.client.post(self.endpoint()).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Decode(e.to_string()))?;
        parsed.first_text().ok_or(GenerationError::EmptyResponse)
    }
}

#[async_trait]
impl Generator for OpenAiCompatProvider {
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        tracing::debug!(
            provider = %self.name,
            model = %self.model,
            prompt_len = prompt.len(),
            "invoking chat completion"
        );
        with_retry(&self.retry, || self.invoke_once(&request)).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
