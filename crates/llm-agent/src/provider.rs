use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAiCompatProvider;
use crate::{GenerationError, RetryPolicy};

// ─── Generator ────────────────────────────────────────────────────────────

/// The single capability every backend offers: turn a prompt into text.
///
/// Implementations apply their own retry policy for transport failures and
/// report persistent failure as an `Err`, never as in-band text.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Short label for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<G: Generator + ?Sized> Generator for Box<G> {
    async fn invoke(&self, prompt: &str) -> Result<String, GenerationError> {
        (**self).invoke(prompt).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// ─── ProviderConfig ───────────────────────────────────────────────────────

/// Closed set of supported backends, selected by the `type` tag in config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Any endpoint speaking the OpenAI chat-completions protocol
    /// (DeepSeek, Mistral, OpenAI, ...).
    OpenaiCompatible {
        base_url: String,
        model: String,
        /// Name of the environment variable holding the API key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key_env: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_tokens: Option<u32>,
    },
    /// A locally hosted model served by Ollama. No API key.
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
        model: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
    },
    Anthropic {
        model: String,
        #[serde(default = "default_anthropic_key_env")]
        api_key_env: String,
        #[serde(default = "default_anthropic_max_tokens")]
        max_tokens: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        temperature: Option<f32>,
    },
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_anthropic_key_env() -> String {
    "ANTHROPIC_API_KEY".to_string()
}

fn default_anthropic_max_tokens() -> u32 {
    4096
}

impl ProviderConfig {
    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::OpenaiCompatible { model, .. }
            | ProviderConfig::Ollama { model, .. }
            | ProviderConfig::Anthropic { model, .. } => model,
        }
    }

    /// Environment variable this provider reads its key from, if any.
    pub fn api_key_env(&self) -> Option<&str> {
        match self {
            ProviderConfig::OpenaiCompatible { api_key_env, .. } => api_key_env.as_deref(),
            ProviderConfig::Ollama { .. } => None,
            ProviderConfig::Anthropic { api_key_env, .. } => Some(api_key_env),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderConfig::OpenaiCompatible { .. } => "openai_compatible",
            ProviderConfig::Ollama { .. } => "ollama",
            ProviderConfig::Anthropic { .. } => "anthropic",
        }
    }
}

// ─── Factory ──────────────────────────────────────────────────────────────

fn read_key(var: &str) -> Result<String, GenerationError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GenerationError::MissingApiKey(var.to_string())),
    }
}

/// Build the generator described by `config`.
///
/// Fails only when a required API key is missing from the environment or
/// the HTTP client cannot be constructed.
pub fn build_generator(
    config: &ProviderConfig,
    retry: &RetryPolicy,
) -> Result<Box<dyn Generator>, GenerationError> {
    let generator: Box<dyn Generator> = match config {
        ProviderConfig::OpenaiCompatible {
            base_url,
            model,
            api_key_env,
            temperature,
            max_tokens,
        } => {
            let key = api_key_env.as_deref().map(read_key).transpose()?;
            Box::new(
                OpenAiCompatProvider::new(base_url, model, key, retry.clone())?
                    .with_temperature(*temperature)
                    .with_max_tokens(*max_tokens),
            )
        }
        ProviderConfig::Ollama {
            base_url,
            model,
            temperature,
        } => Box::new(
            OpenAiCompatProvider::new(
                &format!("{}/v1", base_url.trim_end_matches('/')),
                model,
                None,
                retry.clone(),
            )?
            .with_name("ollama")
            .with_temperature(*temperature),
        ),
        ProviderConfig::Anthropic {
            model,
            api_key_env,
            max_tokens,
            base_url,
            temperature,
        } => {
            let key = read_key(api_key_env)?;
            let mut provider = AnthropicProvider::new(key, model, *max_tokens, retry.clone())?
                .with_temperature(*temperature);
            if let Some(url) = base_url {
                provider = provider.with_base_url(url);
            }
            Box::new(provider)
        }
    };
    tracing::debug!(
        provider = generator.name(),
        model = config.model(),
        "generator ready"
    );
    Ok(generator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_config_yaml_tagged() {
        let yaml = r#"
type: openai_compatible
base_url: https://api.deepseek.com
model: deepseek-chat
api_key_env: DEEPSEEK_API_KEY
temperature: 0.8
"#;
        let cfg: ProviderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.kind(), "openai_compatible");
        assert_eq!(cfg.model(), "deepseek-chat");
        assert_eq!(cfg.api_key_env(), Some("DEEPSEEK_API_KEY"));

        let back = serde_yaml::to_string(&cfg).unwrap();
        assert!(back.contains("type: openai_compatible"));
        let parsed: ProviderConfig = serde_yaml::from_str(&back).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn ollama_defaults_base_url() {
        let cfg: ProviderConfig = serde_yaml::from_str("type: ollama\nmodel: llama3.1\n").unwrap();
        match &cfg {
            ProviderConfig::Ollama { base_url, .. } => {
                assert_eq!(base_url, "http://localhost:11434")
            }
            other => panic!("expected Ollama, got {other:?}"),
        }
        assert_eq!(cfg.api_key_env(), None);
    }

    #[test]
    fn anthropic_defaults() {
        let cfg: ProviderConfig =
            serde_yaml::from_str("type: anthropic\nmodel: claude-sonnet-4-5\n").unwrap();
        assert_eq!(cfg.api_key_env(), Some("ANTHROPIC_API_KEY"));
        match cfg {
            ProviderConfig::Anthropic { max_tokens, .. } => assert_eq!(max_tokens, 4096),
            other => panic!("expected Anthropic, got {other:?}"),
        }
    }

    #[test]
    fn unknown_provider_type_is_rejected() {
        let res: Result<ProviderConfig, _> =
            serde_yaml::from_str("type: huggingface_local\nmodel: x\n");
        assert!(res.is_err());
    }

    #[test]
    fn missing_api_key_fails_build() {
        let cfg = ProviderConfig::OpenaiCompatible {
            base_url: "http://127.0.0.1:1".into(),
            model: "m".into(),
            api_key_env: Some("LLM_AGENT_TEST_KEY_THAT_IS_NEVER_SET".into()),
            temperature: None,
            max_tokens: None,
        };
        let err = build_generator(&cfg, &RetryPolicy::default()).err().unwrap();
        assert!(matches!(err, GenerationError::MissingApiKey(v) if v.contains("NEVER_SET")));
    }

    #[test]
    fn ollama_builds_without_key() {
        let cfg = ProviderConfig::Ollama {
            base_url: "http://127.0.0.1:11434/".into(),
            model: "llama3.1".into(),
            temperature: None,
        };
        let g = build_generator(&cfg, &RetryPolicy::default()).unwrap();
        assert_eq!(g.name(), "ollama");
    }
}
