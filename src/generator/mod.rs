//! Generative-text providers.
//!
//! Each provider turns one instruction into one post. The request budget
//! and response-shape checks are shared; only the wire format differs.

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

use crate::config::{GeneratorConfig, ProviderConfig};
use crate::error::GenerateError;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Enum-based backend for LLM providers.
pub enum Backend {
    OpenAI(openai::OpenAIBackend),
    Anthropic(anthropic::AnthropicBackend),
    Gemini(gemini::GeminiBackend),
    Ollama(ollama::OllamaBackend),
}

impl Backend {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        match self {
            Backend::OpenAI(b) => b.generate(prompt).await,
            Backend::Anthropic(b) => b.generate(prompt).await,
            Backend::Gemini(b) => b.generate(prompt).await,
            Backend::Ollama(b) => b.generate(prompt).await,
        }
    }

    /// Get the backend name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::OpenAI(_) => openai::PROVIDER,
            Backend::Anthropic(_) => anthropic::PROVIDER,
            Backend::Gemini(_) => gemini::PROVIDER,
            Backend::Ollama(_) => ollama::PROVIDER,
        }
    }

    /// Get the model name.
    pub fn model(&self) -> &str {
        match self {
            Backend::OpenAI(b) => &b.model,
            Backend::Anthropic(b) => &b.model,
            Backend::Gemini(b) => &b.model,
            Backend::Ollama(b) => &b.model,
        }
    }
}

/// A provider plus the time budget every call runs under.
pub struct Generator {
    backend: Backend,
    timeout: Duration,
}

impl Generator {
    pub fn new(backend: Backend, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Send one instruction and return the generated post text.
    ///
    /// When the budget runs out the request future is dropped, which aborts
    /// the underlying connection.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        debug!(
            provider = self.backend.name(),
            model = self.backend.model(),
            "Sending generation request"
        );
        match tokio::time::timeout(self.timeout, self.backend.generate(prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(provider = self.backend.name(), limit = ?self.timeout, "Generation timed out");
                Err(GenerateError::Timeout {
                    provider: self.backend.name(),
                    limit: self.timeout,
                })
            }
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }
}

/// Create a generator from configuration.
pub fn create_generator(config: &GeneratorConfig) -> Result<Generator> {
    let client = Client::builder()
        .build()
        .context("Failed to create HTTP client")?;

    let backend = match &config.provider {
        ProviderConfig::OpenAI { model, api_key, base_url } => Backend::OpenAI(
            openai::OpenAIBackend::new(client, model.clone(), api_key.clone(), base_url.clone()),
        ),
        ProviderConfig::Anthropic { model, api_key, base_url } => Backend::Anthropic(
            anthropic::AnthropicBackend::new(client, model.clone(), api_key.clone(), base_url.clone()),
        ),
        ProviderConfig::Gemini { model, api_key, base_url } => Backend::Gemini(
            gemini::GeminiBackend::new(client, model.clone(), api_key.clone(), base_url.clone()),
        ),
        ProviderConfig::Ollama { model, base_url } => {
            Backend::Ollama(ollama::OllamaBackend::new(client, model.clone(), base_url.clone()))
        }
    };

    Ok(Generator::new(backend, config.timeout()))
}

/// Resolve an API key from config or the provider's environment variable.
fn resolve_api_key(
    configured: &Option<String>,
    provider: &'static str,
    env_var: &'static str,
) -> Result<String, GenerateError> {
    configured
        .clone()
        .filter(|k| !k.trim().is_empty())
        .or_else(|| std::env::var(env_var).ok())
        .ok_or(GenerateError::MissingApiKey { provider, env_var })
}

/// Send a request and return the decoded JSON body of a 2xx response.
async fn send_json(provider: &'static str, request: RequestBuilder) -> Result<Value, GenerateError> {
    let response = request
        .send()
        .await
        .map_err(|source| GenerateError::Transport { provider, source })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GenerateError::Status {
            provider,
            status,
            message: error_message(&body),
        });
    }

    response.json::<Value>().await.map_err(|e| {
        if e.is_decode() {
            GenerateError::MalformedResponse {
                provider,
                detail: format!("body is not JSON ({})", e),
            }
        } else {
            GenerateError::Transport { provider, source: e }
        }
    })
}

/// Pull the human-readable message out of an error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "Unknown error".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

/// Read the generated text at `pointer` verbatim; missing or blank text is a shape error.
fn extract_text(provider: &'static str, body: &Value, pointer: &str) -> Result<String, GenerateError> {
    let text = body
        .pointer(pointer)
        .and_then(Value::as_str)
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerateError::MalformedResponse {
            provider,
            detail: format!("expected text at {}", pointer),
        });
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_text_is_verbatim() {
        let body = json!({ "choices": [{ "message": { "content": "hello 👋\n#rust" } }] });
        assert_eq!(
            extract_text("openai", &body, "/choices/0/message/content").unwrap(),
            "hello 👋\n#rust"
        );
    }

    #[test]
    fn test_extract_text_missing_or_blank() {
        for body in [json!({}), json!({ "choices": [] }), json!({ "choices": [{ "message": { "content": "  " } }] })] {
            let err = extract_text("openai", &body, "/choices/0/message/content").unwrap_err();
            assert!(matches!(err, GenerateError::MalformedResponse { .. }));
        }
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"error":{"message":"bad key"}}"#), "bad key");
        assert_eq!(error_message(r#"{"error":"model not found"}"#), "model not found");
        assert_eq!(error_message("gateway down"), "gateway down");
        assert_eq!(error_message(""), "Unknown error");
    }

    #[test]
    fn test_resolve_api_key_prefers_config() {
        let key = resolve_api_key(&Some("sk-1".to_string()), "openai", "POSTGEN_TEST_UNSET_KEY").unwrap();
        assert_eq!(key, "sk-1");
        let err = resolve_api_key(&Some(" ".to_string()), "openai", "POSTGEN_TEST_UNSET_KEY").unwrap_err();
        assert!(matches!(err, GenerateError::MissingApiKey { .. }));
    }

    #[tokio::test]
    async fn test_generator_times_out_slow_provider() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "late", "done": true }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let backend = Backend::Ollama(ollama::OllamaBackend::new(
            Client::new(),
            "m".to_string(),
            server.uri(),
        ));
        let generator = Generator::new(backend, Duration::from_millis(50));
        match generator.generate("x").await {
            Err(GenerateError::Timeout { provider, limit }) => {
                assert_eq!(provider, "ollama");
                assert_eq!(limit, Duration::from_millis(50));
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_create_generator_uses_configured_timeout() {
        let config = GeneratorConfig::default();
        let generator = create_generator(&config).unwrap();
        assert_eq!(generator.timeout, Duration::from_secs(30));
        assert_eq!(generator.backend().name(), "openai");
    }
}
