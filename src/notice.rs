//! Transient user-facing notices with an explicit severity.

use std::fmt;
use std::time::{Duration, Instant};

/// How long a notice stays up unless dismissed.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);
/// Errors stay up longer so they can be read.
pub const ERROR_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
    raised_at: Instant,
    ttl: Duration,
}

impl Notice {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            raised_at: Instant::now(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Severity::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message).with_ttl(ERROR_TTL)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.raised_at) >= self.ttl
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
