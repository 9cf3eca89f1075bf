//! OpenAI backend implementation.
//!
//! Uses the chat completions API with a bearer key.

use super::{extract_text, resolve_api_key, send_json};
use crate::error::GenerateError;
use reqwest::Client;
use serde::Serialize;

pub const PROVIDER: &str = "openai";
const API_KEY_ENV: &str = "OPENAI_API_KEY";
const TEXT_POINTER: &str = "/choices/0/message/content";

/// OpenAI backend for GPT API.
pub struct OpenAIBackend {
    pub model: String,
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl OpenAIBackend {
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

        let request = OpenAIRequest {
            model: &self.model,
            messages: vec![OpenAIMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: 600,
            temperature: 0.7,
        };

        let body = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(api_key)
                .json(&request),
        )
        .await?;

        extract_text(PROVIDER, &body, TEXT_POINTER)
    }
}

#[derive(Debug, Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage<'a> {
    role: &'a str,
    content: &'a str,
}
