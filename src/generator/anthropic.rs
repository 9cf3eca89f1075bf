//! Anthropic Claude backend implementation.

use super::{extract_text, resolve_api_key, send_json};
use crate::error::GenerateError;
use reqwest::Client;
use serde::Serialize;

pub const PROVIDER: &str = "anthropic";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEXT_POINTER: &str = "/content/0/text";

/// Anthropic backend for Claude API.
pub struct AnthropicBackend {
    pub model: String,
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl AnthropicBackend {
    pub fn new(client: Client, model: String, api_key: Option<String>, base_url: String) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Generate a post from a single instruction.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let api_key = resolve_api_key(&self.api_key, PROVIDER, API_KEY_ENV)?;

        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: 600,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
        };

        let body = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/v1/messages", self.base_url))
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request),
        )
        .await?;

        extract_text(PROVIDER, &body, TEXT_POINTER)
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}
