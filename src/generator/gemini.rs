//! Google Gemini backend implementation.
//!
//! The key travels as the `key` query parameter rather than a header.

use super::{extract_text, resolve_api_key, send_json};
use crate::error::GenerateError;
use reqwest::Client;
use serde::Serialize;

pub const PROVIDER: &str = "gemini";
const API_KEY_ENV: &str = "GEMINI_API_KEY";
const TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

pub struct GeminiBackend {
    pub model: String,
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl GeminiBackend {
    pub fn new(client: Client, model: String, api_key: Option<String>, base_url: String) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let api_key = resolve_api_key(&self.api_key, PROVIDER, API_KEY_ENV)?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = send_json(
            PROVIDER,
            self.client
                .post(url)
                .query(&[("key", api_key.as_str())])
                .json(&request),
        )
        .await?;

        extract_text(PROVIDER, &body, TEXT_POINTER)
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}
