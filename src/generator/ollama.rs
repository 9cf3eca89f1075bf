//! Ollama backend implementation.
//!
//! Ollama is a local LLM server; no key is needed.

use super::{extract_text, send_json};
use crate::error::GenerateError;
use reqwest::Client;
use serde::Serialize;

pub const PROVIDER: &str = "ollama";
const TEXT_POINTER: &str = "/response";

/// Ollama backend for local LLM inference.
pub struct OllamaBackend {
    pub model: String,
    base_url: String,
    client: Client,
}

impl OllamaBackend {
    pub fn new(client: Client, model: String, base_url: String) -> Self {
        Self {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Generate a post from a single instruction.
    pub async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                temperature: 0.7,
                num_predict: 600,
            },
        };

        let body = send_json(
            PROVIDER,
            self.client
                .post(format!("{}/api/generate", self.base_url))
                .json(&request),
        )
        .await?;

        extract_text(PROVIDER, &body, TEXT_POINTER)
    }
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: i32,
}
