//! Conversation messages and the mood tags attached to persona replies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Newtype wrapper for message IDs. Allocated from a process-wide counter,
/// so later messages always have larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl MessageId {
    pub fn next() -> Self {
        Self(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The coarse emotional tone of a persona reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoodTag {
    Flirty,
    Romantic,
    Mysterious,
    Sassy,
    Nervous,
}

impl MoodTag {
    pub const ALL: [MoodTag; 5] = [
        Self::Flirty,
        Self::Romantic,
        Self::Mysterious,
        Self::Sassy,
        Self::Nervous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flirty => "flirty",
            Self::Romantic => "romantic",
            Self::Mysterious => "mysterious",
            Self::Sassy => "sassy",
            Self::Nervous => "nervous",
        }
    }

    /// Glyph shown next to a reply with this mood.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Flirty => "😏",
            Self::Romantic => "💕",
            Self::Mysterious => "🌙",
            Self::Sassy => "💅",
            Self::Nervous => "😅",
        }
    }

    pub fn parse(s: &str) -> Option<MoodTag> {
        Self::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for MoodTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Persona,
}

/// A single line of the conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    content: String,
    sender: Sender,
    timestamp: DateTime<Utc>,
    mood: Option<MoodTag>,
}

impl Message {
    pub fn from_user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            mood: None,
        }
    }

    pub fn from_persona(content: impl Into<String>, mood: MoodTag) -> Self {
        Self {
            id: MessageId::next(),
            content: content.into(),
            sender: Sender::Persona,
            timestamp: Utc::now(),
            mood: Some(mood),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> Sender {
        self.sender
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Always `None` for user messages.
    pub fn mood(&self) -> Option<MoodTag> {
        self.mood
    }

    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// A persona reply before it becomes a [`Message`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,
    pub mood: MoodTag,
}

impl AiResponse {
    pub fn new(content: impl Into<String>, mood: MoodTag) -> Self {
        Self {
            content: content.into(),
            mood,
        }
    }

    pub fn into_message(self) -> Message {
        Message::from_persona(self.content, self.mood)
    }
}
