//! The form's state and the operations a user can trigger on it.
//!
//! Each concern keeps its own value: the address field, the chosen options,
//! the generation status, the last generated text, the recent posts list
//! and the current notice. A failure only touches status and notice.

use crate::error::{GenerateError, InputError};
use crate::generator::Generator;
use crate::notice::Notice;
use crate::post::{NewPost, PostId, PostOptions, PostRecord};
use crate::prompt::build_prompt;
use crate::share::{share_with_notice, ShareTarget};
use crate::store::PostRepository;
use crate::validate::{parse_address, AddressField};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Why the last generation did not produce text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Empty or malformed address; nothing was sent.
    Input,
    /// Missing credentials for the provider.
    Configuration,
    /// Network failure or non-success status.
    Transport,
    Timeout,
    /// Success status without usable text.
    MalformedResponse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for Failure {}

impl From<InputError> for Failure {
    fn from(e: InputError) -> Self {
        Self {
            kind: FailureKind::Input,
            message: e.to_string(),
        }
    }
}

impl From<GenerateError> for Failure {
    fn from(e: GenerateError) -> Self {
        let kind = match &e {
            GenerateError::MissingApiKey { .. } => FailureKind::Configuration,
            GenerateError::Transport { .. } | GenerateError::Status { .. } => FailureKind::Transport,
            GenerateError::Timeout { .. } => FailureKind::Timeout,
            GenerateError::MalformedResponse { .. } => FailureKind::MalformedResponse,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}

/// Generation status. Any terminal state may start a new generation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    Generating,
    Generated,
    Failed(Failure),
}

impl Status {
    pub fn is_generating(&self) -> bool {
        matches!(self, Status::Generating)
    }
}

pub struct Session {
    generator: Generator,
    repository: Option<Arc<dyn PostRepository>>,
    share: Box<dyn ShareTarget>,
    directive: String,
    recent_limit: Option<usize>,

    pub address: AddressField,
    pub options: PostOptions,
    status: Status,
    content: Option<String>,
    records: Vec<PostRecord>,
    notice: Option<Notice>,
}

impl Session {
    pub fn new(
        generator: Generator,
        repository: Option<Arc<dyn PostRepository>>,
        share: Box<dyn ShareTarget>,
        directive: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            repository,
            share,
            directive: directive.into(),
            recent_limit: None,
            address: AddressField::default(),
            options: PostOptions::default(),
            status: Status::Idle,
            content: None,
            records: Vec::new(),
            notice: None,
        }
    }

    pub fn with_options(mut self, options: PostOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = Some(limit);
        self
    }

    pub fn set_address(&mut self, value: impl Into<String>) {
        self.address.set(value);
    }

    /// Whether the generate action is enabled.
    pub fn can_generate(&self) -> bool {
        self.address.is_valid() && !self.status.is_generating()
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Text currently on display. Survives failed generations.
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Character count of the displayed text.
    pub fn char_count(&self) -> usize {
        self.content.as_deref().map_or(0, |c| c.chars().count())
    }

    pub fn records(&self) -> &[PostRecord] {
        &self.records
    }

    pub fn persists(&self) -> bool {
        self.repository.is_some()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Raise a notice from outside the session's own operations.
    pub fn notify(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Drop the notice once its time is up.
    pub fn expire_notice(&mut self, now: Instant) {
        if self.notice.as_ref().is_some_and(|n| n.is_expired(now)) {
            self.notice = None;
        }
    }

    pub fn provider(&self) -> &'static str {
        self.generator.backend().name()
    }

    /// Mark the session busy. The interactive form calls this to draw the
    /// busy state before awaiting `generate`.
    pub fn begin_generating(&mut self) {
        self.status = Status::Generating;
    }

    /// Generate a post for the current address and options.
    ///
    /// On success the displayed text is replaced and, when a posts backend
    /// is configured, the post is stored and the recent list refetched. On
    /// failure the displayed text is left as it was.
    pub async fn generate(&mut self) -> Result<(), Failure> {
        if let Err(e) = parse_address(self.address.value()) {
            return Err(self.fail(e.into()));
        }
        let address = self.address.value().to_string();

        self.status = Status::Generating;
        info!(
            %address,
            length = %self.options.length,
            tone = %self.options.tone,
            emoji = self.options.emoji,
            provider = self.provider(),
            "Generating post"
        );

        let prompt = build_prompt(&address, &self.options, &self.directive);
        let text = match self.generator.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(e.into())),
        };

        info!(chars = text.chars().count(), "Post generated");
        self.content = Some(text.clone());
        self.status = Status::Generated;
        self.notice = Some(Notice::success("Post generated"));

        if let Some(repository) = self.repository.clone() {
            let post = NewPost::new(address, text, self.options);
            match repository.insert(post).await {
                Ok(record) => {
                    info!(id = %record.id, "Post saved");
                    self.notice = Some(Notice::success("Post generated and saved"));
                    self.refresh_records().await;
                }
                Err(e) => {
                    error!(error = %e, "Saving post failed");
                    self.notice = Some(Notice::error(e.to_string()));
                }
            }
        }
        Ok(())
    }

    fn fail(&mut self, failure: Failure) -> Failure {
        warn!(kind = ?failure.kind, message = %failure.message, "Generation failed");
        self.notice = Some(Notice::error(failure.message.clone()));
        self.status = Status::Failed(failure.clone());
        failure
    }

    /// Refetch the recent posts. Returns false when the fetch failed.
    pub async fn refresh_records(&mut self) -> bool {
        let Some(repository) = self.repository.clone() else {
            return true;
        };
        match repository.list(self.recent_limit).await {
            Ok(records) => {
                self.records = records;
                true
            }
            Err(e) => {
                error!(error = %e, "Fetching posts failed");
                self.notice = Some(Notice::error(e.to_string()));
                false
            }
        }
    }

    /// Delete one stored post and refetch the list.
    pub async fn delete_record(&mut self, id: &PostId) -> bool {
        let Some(repository) = self.repository.clone() else {
            self.notice = Some(Notice::info("Posts are not stored in this setup"));
            return false;
        };
        match repository.delete(id).await {
            Ok(()) => {
                info!(%id, "Post deleted");
                self.notice = Some(Notice::success("Post deleted"));
                self.refresh_records().await
            }
            Err(e) => {
                error!(%id, error = %e, "Deleting post failed");
                self.notice = Some(Notice::error(e.to_string()));
                false
            }
        }
    }

    /// Share or copy the displayed text.
    pub async fn share_content(&mut self) {
        let text = self.content.clone().unwrap_or_default();
        self.notice = Some(share_with_notice(self.share.as_ref(), &text).await);
    }

    /// Share or copy arbitrary text, e.g. a stored post.
    pub async fn share_text(&mut self, text: &str) {
        self.notice = Some(share_with_notice(self.share.as_ref(), text).await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShareError;
    use crate::generator::{ollama::OllamaBackend, Backend};
    use crate::notice::Severity;
    use crate::post::{Length, Tone};
    use crate::store::memory::MemoryRepository;
    use async_trait::async_trait;
    use reqwest::Client;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str =
        "Exciting developments in tech today. Más información: https://example.com/article";

    struct NoShare;

    #[async_trait]
    impl ShareTarget for NoShare {
        fn name(&self) -> &'static str {
            "none"
        }

        fn done_message(&self) -> &'static str {
            "Shared"
        }

        async fn share(&self, _text: &str) -> Result<(), ShareError> {
            Ok(())
        }
    }

    fn generator(server: &MockServer, timeout: Duration) -> Generator {
        let backend = Backend::Ollama(OllamaBackend::new(
            Client::new(),
            "m".to_string(),
            server.uri(),
        ));
        Generator::new(backend, timeout)
    }

    async fn mock_text(server: &MockServer, body: serde_json::Value, delay: Duration) {
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
            .mount(server)
            .await;
    }

    fn session(server: &MockServer, repo: Option<Arc<MemoryRepository>>) -> Session {
        session_with_timeout(server, repo, Duration::from_secs(30))
    }

    fn session_with_timeout(
        server: &MockServer,
        repo: Option<Arc<MemoryRepository>>,
        timeout: Duration,
    ) -> Session {
        let repo = repo.map(|r| r as Arc<dyn PostRepository>);
        Session::new(generator(server, timeout), repo, Box::new(NoShare), "")
    }

    #[tokio::test]
    async fn test_invalid_address_blocks_generation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut session = session(&server, None);
        for bad in ["", "example.com/article", "::nope"] {
            session.set_address(bad);
            assert!(!session.can_generate());
            let failure = session.generate().await.unwrap_err();
            assert_eq!(failure.kind, FailureKind::Input);
        }
        assert!(session.content().is_none());
    }

    #[tokio::test]
    async fn test_displayed_content_is_returned_text() {
        let server = MockServer::start().await;
        mock_text(&server, json!({ "response": SAMPLE, "done": true }), Duration::ZERO).await;

        let mut session = session(&server, None).with_options(PostOptions {
            length: Length::Medium,
            tone: Tone::Professional,
            emoji: false,
        });
        session.set_address("https://example.com/article");
        assert!(session.can_generate());

        session.generate().await.unwrap();
        assert_eq!(session.status(), &Status::Generated);
        assert_eq!(session.content(), Some(SAMPLE));
        assert_eq!(session.char_count(), SAMPLE.chars().count());
        assert_eq!(session.notice().unwrap().severity, Severity::Success);
    }

    #[tokio::test]
    async fn test_timeout_keeps_previous_content() {
        let fast = MockServer::start().await;
        mock_text(&fast, json!({ "response": "first post" }), Duration::ZERO).await;
        let mut session = session(&fast, None);
        session.set_address("https://example.com/article");
        session.generate().await.unwrap();

        let slow = MockServer::start().await;
        mock_text(&slow, json!({ "response": "too late" }), Duration::from_millis(500)).await;
        session.generator = generator(&slow, Duration::from_millis(50));

        let failure = session.generate().await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Timeout);
        assert_eq!(session.content(), Some("first post"));
        assert!(session.notice().unwrap().is_error());
        assert!(matches!(session.status(), Status::Failed(_)));

        // Terminal states are re-entrant.
        session.generator = generator(&fast, Duration::from_secs(30));
        session.generate().await.unwrap();
        assert_eq!(session.status(), &Status::Generated);
    }

    #[tokio::test]
    async fn test_malformed_response_inserts_nothing() {
        let server = MockServer::start().await;
        mock_text(&server, json!({ "response": "", "done": true }), Duration::ZERO).await;
        let repo = Arc::new(MemoryRepository::default());

        let mut session = session(&server, Some(repo.clone()));
        session.set_address("https://example.com/article");
        let failure = session.generate().await.unwrap_err();

        assert_eq!(failure.kind, FailureKind::MalformedResponse);
        assert_eq!(repo.len(), 0);
        assert!(session.content().is_none());
    }

    #[tokio::test]
    async fn test_failed_save_still_shows_generated_post() {
        let server = MockServer::start().await;
        mock_text(&server, json!({ "response": SAMPLE }), Duration::ZERO).await;
        let repo = Arc::new(MemoryRepository::rejecting_inserts());

        let mut session = session(&server, Some(repo.clone()));
        session.set_address("https://example.com/article");
        session.generate().await.unwrap();

        assert_eq!(session.status(), &Status::Generated);
        assert_eq!(session.content(), Some(SAMPLE));
        let notice = session.notice().unwrap();
        assert!(notice.is_error());
        assert!(notice.message.contains("Could not save post"));
        assert_eq!(repo.len(), 0);
        assert!(session.records().is_empty());
    }

    #[tokio::test]
    async fn test_status_error_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let mut session = session(&server, None);
        session.set_address("https://example.com/article");
        let failure = session.generate().await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Transport);
        assert!(failure.message.contains("502"));
    }

    #[tokio::test]
    async fn test_successful_generation_is_listed_first() {
        let server = MockServer::start().await;
        mock_text(&server, json!({ "response": SAMPLE }), Duration::ZERO).await;
        let repo = Arc::new(MemoryRepository::default());

        let mut session = session(&server, Some(repo.clone())).with_recent_limit(10);
        session.set_address("https://old.example.com");
        session.generate().await.unwrap();

        let options = PostOptions {
            length: Length::Long,
            tone: Tone::Analytical,
            emoji: true,
        };
        session.options = options;
        session.set_address("https://example.com/article");
        session.generate().await.unwrap();

        let records = session.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].address, "https://example.com/article");
        assert_eq!(records[0].options(), options);
        assert_eq!(records[0].content, SAMPLE);
        assert_eq!(records[1].address, "https://old.example.com");
    }

    #[tokio::test]
    async fn test_delete_removes_only_that_record() {
        let server = MockServer::start().await;
        mock_text(&server, json!({ "response": "post" }), Duration::ZERO).await;
        let repo = Arc::new(MemoryRepository::default());

        let mut session = session(&server, Some(repo.clone()));
        for n in 0..3 {
            session.set_address(format!("https://example.com/{n}"));
            session.generate().await.unwrap();
        }
        let victim = session.records()[1].id.clone();

        assert!(session.delete_record(&victim).await);
        let remaining: Vec<_> = session.records().iter().map(|r| r.address.clone()).collect();
        assert_eq!(remaining, vec!["https://example.com/2", "https://example.com/0"]);
        assert_eq!(session.notice().unwrap().severity, Severity::Success);

        // Deleting again is not an error.
        assert!(session.delete_record(&victim).await);
        assert_eq!(session.records().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_becomes_notice() {
        let server = MockServer::start().await;
        let repo = Arc::new(MemoryRepository::failing());
        let mut session = session(&server, Some(repo));
        assert!(!session.refresh_records().await);
        assert!(session.notice().unwrap().message.contains("Could not load posts"));
        session.dismiss_notice();
        assert!(session.notice().is_none());
    }

    #[tokio::test]
    async fn test_share_without_content_is_an_error_notice() {
        let server = MockServer::start().await;
        let mut session = session(&server, None);
        session.share_content().await;
        assert!(session.notice().unwrap().is_error());
        session.share_text("hello").await;
        assert_eq!(session.notice().unwrap().message, "Shared");
    }

    #[tokio::test]
    async fn test_without_persistence_delete_is_informational() {
        let server = MockServer::start().await;
        let mut session = session_with_timeout(&server, None, Duration::from_secs(1));
        assert!(!session.persists());
        assert!(!session.delete_record(&PostId::new("1")).await);
        assert_eq!(session.notice().unwrap().severity, Severity::Info);
    }
}
