//! Posts backend.
//!
//! Records live in one table behind a PostgREST-style HTTP API (Supabase
//! exposes exactly this). The client only lists, inserts and deletes;
//! records are never updated.

use crate::config::PersistenceConfig;
use crate::error::StoreError;
use crate::post::{NewPost, PostId, PostRecord};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

const API_KEY_ENV: &str = "POSTGEN_DB_KEY";

/// Storage for generated posts.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Newest first, capped at `limit` when given.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<PostRecord>, StoreError>;

    /// Store a post; the backend assigns `id` and `created_at`.
    async fn insert(&self, post: NewPost) -> Result<PostRecord, StoreError>;

    /// Remove one post. Deleting an id that is already gone is not an error.
    async fn delete(&self, id: &PostId) -> Result<(), StoreError>;
}

/// PostgREST client for the posts table.
pub struct RestRepository {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestRepository {
    pub fn new(base_url: &str, table: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table),
            api_key,
        })
    }

    /// Build the repository from config, resolving the key from POSTGEN_DB_KEY if unset.
    pub fn from_config(config: &PersistenceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .ok_or_else(|| {
                anyhow!(
                    "Posts backend key not found. Set {} environment variable \
                     or add api_key to the [persistence] section.",
                    API_KEY_ENV
                )
            })?;

        Self::new(
            &config.url,
            &config.table,
            api_key,
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Send and require a 2xx, rendering any failure as a message for `StoreError`.
async fn send_checked(request: RequestBuilder) -> Result<Response, String> {
    let response = request.send().await.map_err(|e| e.to_string())?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(body);
    Err(format!("status {}: {}", status, message.trim()))
}

#[async_trait]
impl PostRepository for RestRepository {
    async fn list(&self, limit: Option<usize>) -> Result<Vec<PostRecord>, StoreError> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }

        let request = self.authorized(self.client.get(&self.endpoint).query(&query));
        let response = send_checked(request).await.map_err(StoreError::Fetch)?;
        let records: Vec<PostRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Fetch(e.to_string()))?;

        debug!(count = records.len(), "Fetched posts");
        Ok(records)
    }

    async fn insert(&self, post: NewPost) -> Result<PostRecord, StoreError> {
        let request = self.authorized(
            self.client
                .post(&self.endpoint)
                .header("Prefer", "return=representation")
                .json(&[&post]),
        );
        let response = send_checked(request).await.map_err(StoreError::Insert)?;
        let mut created: Vec<PostRecord> = response
            .json()
            .await
            .map_err(|e| StoreError::Insert(e.to_string()))?;

        let record = created
            .pop()
            .ok_or_else(|| StoreError::Insert("backend returned no row".to_string()))?;
        debug!(id = %record.id, "Inserted post");
        Ok(record)
    }

    async fn delete(&self, id: &PostId) -> Result<(), StoreError> {
        let filter = format!("eq.{}", id.as_str());
        let request = self.authorized(
            self.client
                .delete(&self.endpoint)
                .query(&[("id", filter.as_str())]),
        );
        send_checked(request).await.map_err(StoreError::Delete)?;
        debug!(%id, "Deleted post");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod memory {
    //! In-process repository used by session tests.

    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryRepository {
        rows: Mutex<Vec<PostRecord>>,
        next_id: Mutex<u64>,
        fail_fetch: bool,
        fail_insert: bool,
    }

    impl MemoryRepository {
        /// A repository whose every `list` fails.
        pub fn failing() -> Self {
            Self {
                fail_fetch: true,
                ..Self::default()
            }
        }

        /// A repository whose every `insert` fails.
        pub fn rejecting_inserts() -> Self {
            Self {
                fail_insert: true,
                ..Self::default()
            }
        }

        pub fn len(&self) -> usize {
            self.rows.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PostRepository for MemoryRepository {
        async fn list(&self, limit: Option<usize>) -> Result<Vec<PostRecord>, StoreError> {
            if self.fail_fetch {
                return Err(StoreError::Fetch("backend unavailable".to_string()));
            }
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            if let Some(limit) = limit {
                rows.truncate(limit);
            }
            Ok(rows)
        }

        async fn insert(&self, post: NewPost) -> Result<PostRecord, StoreError> {
            if self.fail_insert {
                return Err(StoreError::Insert("row rejected".to_string()));
            }
            let mut rows = self.rows.lock().unwrap();
            let mut next_id = self.next_id.lock().unwrap();
            *next_id += 1;
            // Keep timestamps strictly increasing even within one clock tick.
            let newest = rows.iter().map(|r| r.created_at).max();
            let now = Utc::now();
            let created_at = match newest {
                Some(t) if t >= now => t + ChronoDuration::milliseconds(1),
                _ => now,
            };
            let record = PostRecord {
                id: PostId::new(next_id.to_string()),
                address: post.address,
                content: post.content,
                length_preference: post.length_preference,
                tone_preference: post.tone_preference,
                emoji_preference: post.emoji_preference,
                created_at,
            };
            rows.push(record.clone());
            Ok(record)
        }

        async fn delete(&self, id: &PostId) -> Result<(), StoreError> {
            self.rows.lock().unwrap().retain(|r| &r.id != id);
            Ok(())
        }
    }
}
