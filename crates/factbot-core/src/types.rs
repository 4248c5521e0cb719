//! Core types for FactBot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the author of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat completion APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged turn in a conversation.
///
/// Exchanges are immutable once created; conversations are ordered
/// sequences of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    role: Role,
    text: String,
}

impl Exchange {
    /// Create a new exchange
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    /// Create a system exchange
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    /// Create a user exchange
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    /// Create an assistant exchange
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// A message as delivered by the chat gateway callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Gateway message ID; generated when the gateway does not supply one
    #[serde(default)]
    pub id: Option<String>,

    /// Author identity
    pub author: String,

    /// Whether the author is a bot (self-authored messages are discarded)
    #[serde(default)]
    pub author_is_bot: bool,

    /// Channel identity
    pub channel: String,

    /// Message text
    pub text: String,

    /// Time the gateway received the message
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Create an inbound message from a human author
    pub fn new(
        author: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            author: author.into(),
            author_is_bot: false,
            channel: channel.into(),
            text: text.into(),
            timestamp: None,
        }
    }

    /// Set the gateway message ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark the author as a bot
    pub fn from_bot(mut self) -> Self {
        self.author_is_bot = true;
        self
    }

    /// Convert into a pending message, filling in missing ID and timestamp
    pub fn into_pending(self) -> PendingMessage {
        PendingMessage {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            author: self.author,
            channel: self.channel,
            text: self.text,
            received_at: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// A message waiting for, or undergoing, classification.
///
/// Owned by the intake queue until dequeued, then by the dispatcher task
/// handling it. Re-enqueued unchanged when classification times out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMessage {
    pub id: String,
    pub author: String,
    pub channel: String,
    pub text: String,
    pub received_at: DateTime<Utc>,
}
