use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Enums
// =============================================================================

/// Who wrote a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// Typed by the user.
    User,
    /// Canned reply produced by the bot.
    Bot,
}

impl Author {
    /// Column value stored in `messages.author`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }

    /// Parse the stored column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "bot" => Some(Self::Bot),
            _ => None,
        }
    }

    pub const fn is_user(self) -> bool {
        matches!(self, Self::User)
    }
}

impl std::fmt::Display for Author {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A registered user. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique display name.
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// A conversation between one user and the bot about a single topic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Lower-cased response catalog key.
    pub topic: String,
    pub created_at: DateTime<Utc>,
}

/// A single message inside a conversation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub author: Author,
    /// Empty for a streamed bot reply until the stream is finalized.
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A conversation together with its messages, oldest first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Row counts across the three tables plus conversations per topic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStats {
    pub user_count: u64,
    pub conversation_count: u64,
    pub message_count: u64,
    pub topic_counts: std::collections::BTreeMap<String, u64>,
}
