use crate::error::{BacklogError, Result};
use crate::paths;
use crate::prompts::ReviewFocus;
use llm_agent::{ProviderConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ConvergenceConfig
// ---------------------------------------------------------------------------

/// Above this many rounds a run is almost certainly oscillating.
const MAX_SENSIBLE_ITERATIONS: u32 = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub focus: ReviewFocus,
}

fn default_max_iterations() -> u32 {
    50
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            focus: ReviewFocus::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_STORE_FILE)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Key into `providers` naming the backend every role uses.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default)]
    pub retry: RetryPolicy,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub convergence: ConvergenceConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_version() -> u32 {
    1
}

impl Config {
    /// The configuration `backlog init` writes: DeepSeek as the active
    /// provider, with a local Ollama model as an alternative.
    pub fn default_for_init() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "deepseek".to_string(),
            ProviderConfig::OpenaiCompatible {
                base_url: "https://api.deepseek.com".to_string(),
                model: "deepseek-chat".to_string(),
                api_key_env: Some("DEEPSEEK_API_KEY".to_string()),
                temperature: Some(0.2),
                max_tokens: Some(8192),
            },
        );
        providers.insert(
            "ollama".to_string(),
            ProviderConfig::Ollama {
                base_url: "http://localhost:11434".to_string(),
                model: "llama3.1".to_string(),
                temperature: None,
            },
        );
        Self {
            version: default_version(),
            convergence: ConvergenceConfig::default(),
            store: StoreConfig::default(),
            generation: GenerationConfig {
                provider: "deepseek".to_string(),
                providers,
                retry: RetryPolicy::default(),
            },
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(BacklogError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    /// Write [`Config::default_for_init`] unless a config already exists.
    /// Returns true if the file was written.
    pub fn init(root: &Path) -> Result<bool> {
        let data = serde_yaml::to_string(&Self::default_for_init())?;
        crate::io::write_if_missing(&paths::config_path(root), data.as_bytes())
    }

    /// Absolute path of the artifact store for a project rooted at `root`.
    pub fn store_path(&self, root: &Path) -> PathBuf {
        paths::store_path(root, &self.store.path)
    }

    /// The provider entry selected by `generation.provider`.
    pub fn active_provider(&self) -> Result<&ProviderConfig> {
        self.generation
            .providers
            .get(&self.generation.provider)
            .ok_or_else(|| BacklogError::UnknownProvider(self.generation.provider.clone()))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. The active provider must exist
        if self.active_provider().is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "generation.provider '{}' is not defined in generation.providers",
                    self.generation.provider
                ),
            });
        }

        // 2. Iteration cap must allow at least one round and stay bounded
        let max = self.convergence.max_iterations;
        if max == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "convergence.max_iterations is 0; no review rounds will run".to_string(),
            });
        } else if max > MAX_SENSIBLE_ITERATIONS {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "convergence.max_iterations is {max}; runs above {MAX_SENSIBLE_ITERATIONS} rounds rarely converge"
                ),
            });
        }

        // 3. Every provider needs a model, and keyed providers need their key set
        for (name, provider) in &self.generation.providers {
            if provider.model().trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("provider '{name}' has an empty model"),
                });
            }
            if let Some(var) = provider.api_key_env() {
                let set = std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false);
                if !set {
                    let level = if name == &self.generation.provider {
                        WarnLevel::Error
                    } else {
                        WarnLevel::Warning
                    };
                    warnings.push(ConfigWarning {
                        level,
                        message: format!("provider '{name}' reads its API key from {var}, which is not set"),
                    });
                }
            }
        }

        // 4. Retry policy must make at least one attempt
        if self.generation.retry.max_attempts == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "generation.retry.max_attempts is 0; no request would ever be sent"
                    .to_string(),
            });
        }

        warnings
    }
}
