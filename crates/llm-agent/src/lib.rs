//! `llm-agent`: text-generation backends behind one `invoke(prompt)` call.
//!
//! # Architecture
//!
//! ```text
//! ProviderConfig (tagged union, from config.yaml)
//!     │
//!     ▼
//! build_generator ← closed registry: openai_compatible | ollama | anthropic
//!     │
//!     ▼
//! Box<dyn Generator>  ← invoke(prompt) -> Result<String, GenerationError>
//!     │                  transport retries live inside each provider
//!     ▼
//! check_output        ← rejects sentinel-bearing or blank text
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use llm_agent::{build_generator, check_output, ProviderConfig, RetryPolicy};
//!
//! let cfg = ProviderConfig::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model: "llama3.1".into(),
//!     temperature: None,
//! };
//! let generator = build_generator(&cfg, &RetryPolicy::default())?;
//! let text = check_output(generator.invoke("Summarise this project").await?)?;
//! ```

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod provider;
pub mod retry;
pub mod sentinel;
pub mod types;

#[cfg(test)]
mod tests;

pub use error::GenerationError;
pub use provider::{build_generator, Generator, ProviderConfig};
pub use retry::{with_retry, RetryPolicy};
pub use sentinel::{check_output, ERROR_SENTINEL};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GenerationError>;
