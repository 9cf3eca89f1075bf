//! Getting generated text out of the application.
//!
//! The target is picked once at startup from configuration.

use crate::config::{ShareConfig, ShareMode};
use crate::error::ShareError;
use crate::notice::Notice;
use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

#[async_trait]
pub trait ShareTarget: Send + Sync {
    fn name(&self) -> &'static str;

    /// What the user is told once `share` succeeds.
    fn done_message(&self) -> &'static str;

    async fn share(&self, text: &str) -> Result<(), ShareError>;
}

/// Opens a share-intent page in the system browser with the text prefilled.
pub struct BrowserShare {
    intent_url: Url,
}

impl BrowserShare {
    pub fn new(intent_url: Url) -> Self {
        Self { intent_url }
    }

    /// The page that `share` opens for `text`.
    pub fn intent_for(&self, text: &str) -> Url {
        let mut url = self.intent_url.clone();
        url.query_pairs_mut().append_pair("text", text);
        url
    }
}

#[async_trait]
impl ShareTarget for BrowserShare {
    fn name(&self) -> &'static str {
        "browser"
    }

    fn done_message(&self) -> &'static str {
        "Share page opened in your browser"
    }

    async fn share(&self, text: &str) -> Result<(), ShareError> {
        let url = self.intent_for(text);
        webbrowser::open(url.as_str()).map_err(|e| ShareError::Browser(e.to_string()))
    }
}

/// Copies the text to the system clipboard.
pub struct ClipboardShare;

#[async_trait]
impl ShareTarget for ClipboardShare {
    fn name(&self) -> &'static str {
        "clipboard"
    }

    fn done_message(&self) -> &'static str {
        "Post copied to clipboard"
    }

    async fn share(&self, text: &str) -> Result<(), ShareError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ShareError::Clipboard(e.to_string()))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| ShareError::Clipboard(e.to_string()))
    }
}

/// Choose the share target for this run.
pub fn select_share_target(config: &ShareConfig) -> Box<dyn ShareTarget> {
    let intent = config
        .intent_url
        .as_deref()
        .and_then(|raw| match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(intent_url = raw, error = %e, "Ignoring invalid share intent URL");
                None
            }
        });

    let target: Box<dyn ShareTarget> = match (config.mode, intent) {
        (ShareMode::Clipboard, _) | (_, None) => Box::new(ClipboardShare),
        (ShareMode::Browser | ShareMode::Auto, Some(url)) => Box::new(BrowserShare::new(url)),
    };
    info!(share_target = target.name(), "Share target selected");
    target
}

/// Share `text` and describe the outcome.
pub async fn share_with_notice(target: &dyn ShareTarget, text: &str) -> Notice {
    if text.trim().is_empty() {
        return Notice::error(ShareError::NothingToShare.to_string());
    }
    match target.share(text).await {
        Ok(()) => Notice::success(target.done_message()),
        Err(e) => {
            warn!(share_target = target.name(), error = %e, "Share failed");
            Notice::error(e.to_string())
        }
    }
}
