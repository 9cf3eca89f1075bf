//! Failure kinds surfaced to the user.
//!
//! Every variant is recoverable: the session turns it into a notice and
//! stays interactive.

use std::time::Duration;
use thiserror::Error;

/// Address rejected before any network call is made.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Please enter a web address")]
    Empty,
    #[error("Not a valid absolute URL: {0}")]
    Malformed(String),
}

/// A generation request that did not produce text.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("{provider} API key not found. Set {env_var} or add api_key to the config file")]
    MissingApiKey {
        provider: &'static str,
        env_var: &'static str,
    },
    #[error("Failed to reach {provider}: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} request failed with status {status}: {message}")]
    Status {
        provider: &'static str,
        status: reqwest::StatusCode,
        message: String,
    },
    #[error("{provider} did not answer within {}s", .limit.as_secs())]
    Timeout {
        provider: &'static str,
        limit: Duration,
    },
    #[error("{provider} returned no post text: {detail}")]
    MalformedResponse {
        provider: &'static str,
        detail: String,
    },
}

/// A failed round-trip to the posts backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Could not load posts: {0}")]
    Fetch(String),
    #[error("Could not save post: {0}")]
    Insert(String),
    #[error("Could not delete post: {0}")]
    Delete(String),
}

/// Share or clipboard hand-off failed.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("Nothing to share yet")]
    NothingToShare,
    #[error("Could not open the share page: {0}")]
    Browser(String),
    #[error("Could not copy to clipboard: {0}")]
    Clipboard(String),
}
