//! Configuration management for postgen.
//!
//! Configuration is loaded from `~/.config/postgen/config.toml`.

use crate::post::PostOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Generative-text provider.
    #[serde(default)]
    pub generator: GeneratorConfig,
    /// Prompt style and form defaults.
    #[serde(default)]
    pub prompt: PromptConfig,
    /// Posts backend. Without it, nothing is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persistence: Option<PersistenceConfig>,
    /// Share behaviour.
    #[serde(default)]
    pub share: ShareConfig,
}

/// Generation provider and its request budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(flatten)]
    pub provider: ProviderConfig,
    /// Seconds before an in-flight generation is abandoned.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Backend configuration for LLM providers.
///
/// `provider` may be left out, in which case OpenAI is used.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "provider", rename_all = "lowercase")]
pub enum ProviderConfig {
    /// OpenAI chat completions.
    OpenAI {
        model: String,
        /// API key (prefer OPENAI_API_KEY env var).
        #[serde(skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        base_url: String,
    },
    /// Anthropic Claude API.
    Anthropic {
        model: String,
        /// API key (prefer ANTHROPIC_API_KEY env var).
        #[serde(skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        base_url: String,
    },
    /// Google Gemini, keyed by query parameter.
    Gemini {
        model: String,
        /// API key (prefer GEMINI_API_KEY env var).
        #[serde(skip_serializing_if = "Option::is_none")]
        api_key: Option<String>,
        base_url: String,
    },
    /// Ollama local backend.
    Ollama {
        model: String,
        base_url: String,
    },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::OpenAI {
            model: default_openai_model(),
            api_key: None,
            base_url: default_openai_url(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ProviderKind {
    #[default]
    OpenAI,
    Anthropic,
    Gemini,
    Ollama,
}

/// The `[generator]` provider fields before the tag is resolved.
#[derive(Deserialize)]
struct RawProvider {
    #[serde(default)]
    provider: ProviderKind,
    model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
}

impl<'de> Deserialize<'de> for ProviderConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawProvider::deserialize(deserializer)?;
        Ok(match raw.provider {
            ProviderKind::OpenAI => ProviderConfig::OpenAI {
                model: raw.model.unwrap_or_else(default_openai_model),
                api_key: raw.api_key,
                base_url: raw.base_url.unwrap_or_else(default_openai_url),
            },
            ProviderKind::Anthropic => ProviderConfig::Anthropic {
                model: raw.model.unwrap_or_else(default_anthropic_model),
                api_key: raw.api_key,
                base_url: raw.base_url.unwrap_or_else(default_anthropic_url),
            },
            ProviderKind::Gemini => ProviderConfig::Gemini {
                model: raw.model.unwrap_or_else(default_gemini_model),
                api_key: raw.api_key,
                base_url: raw.base_url.unwrap_or_else(default_gemini_url),
            },
            ProviderKind::Ollama => ProviderConfig::Ollama {
                model: raw.model.unwrap_or_else(default_ollama_model),
                base_url: raw.base_url.unwrap_or_else(default_ollama_url),
            },
        })
    }
}

fn default_generation_timeout() -> u64 {
    30
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

/// Prompt style and the options the form starts with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Locale and style directive appended to every instruction.
    #[serde(default = "default_directive")]
    pub directive: String,
    #[serde(default)]
    pub defaults: PostOptions,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            directive: default_directive(),
            defaults: PostOptions::default(),
        }
    }
}

fn default_directive() -> String {
    "Write in the language of the page. Use plain text with line breaks, no markdown. \
     End with the original link."
        .to_string()
}

/// PostgREST-style posts backend (for example a Supabase project).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`.
    pub url: String,
    /// Anon or service key (prefer POSTGEN_DB_KEY env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    /// How many posts the recent list shows.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_table() -> String {
    "posts".to_string()
}

fn default_recent_limit() -> usize {
    10
}

fn default_store_timeout() -> u64 {
    10
}

/// How generated text leaves the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareMode {
    /// Browser when an intent URL is configured, clipboard otherwise.
    #[default]
    Auto,
    Browser,
    Clipboard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareConfig {
    #[serde(default)]
    pub mode: ShareMode,
    /// Share-intent page; the post text is passed as the `text` query parameter.
    #[serde(default = "default_intent_url", skip_serializing_if = "Option::is_none")]
    pub intent_url: Option<String>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            mode: ShareMode::Auto,
            intent_url: default_intent_url(),
        }
    }
}

fn default_intent_url() -> Option<String> {
    Some("https://x.com/intent/post".to_string())
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("postgen"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory for the log file written by the interactive form.
    pub fn state_dir() -> Result<PathBuf> {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .map(|p| p.join("postgen"))
            .context("Could not determine state directory")
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Get the provider name.
    pub fn provider_name(&self) -> &'static str {
        match &self.generator.provider {
            ProviderConfig::OpenAI { .. } => "openai",
            ProviderConfig::Anthropic { .. } => "anthropic",
            ProviderConfig::Gemini { .. } => "gemini",
            ProviderConfig::Ollama { .. } => "ollama",
        }
    }

    /// Get the model name.
    pub fn model_name(&self) -> &str {
        match &self.generator.provider {
            ProviderConfig::OpenAI { model, .. }
            | ProviderConfig::Anthropic { model, .. }
            | ProviderConfig::Gemini { model, .. }
            | ProviderConfig::Ollama { model, .. } => model,
        }
    }
}
