//! Post records and the stylistic options a post is generated with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Target length of a generated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
}

impl Length {
    pub const ALL: [Length; 3] = [Length::Short, Length::Medium, Length::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            Length::Short => "short",
            Length::Medium => "medium",
            Length::Long => "long",
        }
    }

    /// Word budget handed to the model.
    pub fn word_range(self) -> &'static str {
        match self {
            Length::Short => "under 50 words",
            Length::Medium => "between 50 and 150 words",
            Length::Long => "between 150 and 300 words",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len() - 1)
    }
}

/// Voice of a generated post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Enthusiastic,
    Formal,
    Informative,
    Analytical,
}

impl Tone {
    pub const ALL: [Tone; 6] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Enthusiastic,
        Tone::Formal,
        Tone::Informative,
        Tone::Analytical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Casual => "casual",
            Tone::Enthusiastic => "enthusiastic",
            Tone::Formal => "formal",
            Tone::Informative => "informative",
            Tone::Analytical => "analytical",
        }
    }

    pub fn next(self) -> Self {
        cycle(&Self::ALL, self, 1)
    }

    pub fn prev(self) -> Self {
        cycle(&Self::ALL, self, Self::ALL.len() - 1)
    }
}

fn cycle<T: Copy + PartialEq>(all: &[T], current: T, step: usize) -> T {
    let idx = all.iter().position(|v| *v == current).unwrap_or(0);
    all[(idx + step) % all.len()]
}

impl fmt::Display for Length {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stylistic choices a user makes in the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostOptions {
    #[serde(default)]
    pub length: Length,
    #[serde(default)]
    pub tone: Tone,
    #[serde(default)]
    pub emoji: bool,
}

/// Server-assigned record identifier.
///
/// Backends hand out either integer keys or UUIDs, so the id is kept as
/// text and written back the way it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for PostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => PostId(n.to_string()),
            Raw::Text(s) => PostId(s),
        })
    }
}

/// A stored post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: PostId,
    pub address: String,
    pub content: String,
    pub length_preference: Length,
    pub tone_preference: Tone,
    pub emoji_preference: bool,
    pub created_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn options(&self) -> PostOptions {
        PostOptions {
            length: self.length_preference,
            tone: self.tone_preference,
            emoji: self.emoji_preference,
        }
    }
}

/// Fields supplied by the client on insert; `id` and `created_at` come from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    pub address: String,
    pub content: String,
    pub length_preference: Length,
    pub tone_preference: Tone,
    pub emoji_preference: bool,
}

impl NewPost {
    pub fn new(address: impl Into<String>, content: impl Into<String>, options: PostOptions) -> Self {
        Self {
            address: address.into(),
            content: content.into(),
            length_preference: options.length,
            tone_preference: options.tone,
            emoji_preference: options.emoji,
        }
    }
}
