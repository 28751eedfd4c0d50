//! Repository implementations for SQLite-backed persistence.
//!
//! One repository per table. Repositories generate identifiers and
//! creation timestamps at insert time and return the stored entity.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeZone, Utc};
use rusqlite::OptionalExtension;
use tracing::debug;
use uuid::Uuid;

use huddle_core::error::HuddleError;
use huddle_core::types::{Author, Conversation, Message, User};

use crate::db::Database;

/// Repository for registered users.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new user.
    ///
    /// Returns `HuddleError::Duplicate` when the username is already taken.
    pub fn create(&self, username: &str) -> Result<User, HuddleError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            created_at: stored_now(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    user.id.to_string(),
                    user.username,
                    user.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    HuddleError::Duplicate(format!("username '{}'", user.username))
                } else {
                    HuddleError::Storage(format!("Failed to save user: {}", e))
                }
            })?;
            Ok(())
        })?;
        Ok(user)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>, HuddleError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, username, created_at FROM users WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_user(row)),
                )
                .optional()
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    pub fn exists(&self, id: Uuid) -> Result<bool, HuddleError> {
        self.db.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM users WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| HuddleError::Storage(e.to_string()))?;
            Ok(found.is_some())
        })
    }
}

/// Repository for conversations.
pub struct ConversationRepository {
    db: Arc<Database>,
}

impl ConversationRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new conversation owned by `user_id`.
    pub fn create(&self, user_id: Uuid, topic: &str) -> Result<Conversation, HuddleError> {
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_id,
            topic: topic.to_string(),
            created_at: stored_now(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO conversations (id, user_id, topic, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    conversation.id.to_string(),
                    conversation.user_id.to_string(),
                    conversation.topic,
                    conversation.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| HuddleError::Storage(format!("Failed to save conversation: {}", e)))?;
            Ok(())
        })?;
        debug!(conversation_id = %conversation.id, topic, "Conversation created");
        Ok(conversation)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Conversation>, HuddleError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, user_id, topic, created_at FROM conversations WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_conversation(row)),
                )
                .optional()
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    /// Find a conversation only if it belongs to `user_id`.
    pub fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Conversation>, HuddleError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, user_id, topic, created_at FROM conversations
                     WHERE id = ?1 AND user_id = ?2",
                    rusqlite::params![id.to_string(), user_id.to_string()],
                    |row| Ok(row_to_conversation(row)),
                )
                .optional()
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    /// All conversations of a user, oldest first.
    pub fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Conversation>, HuddleError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, topic, created_at FROM conversations
                     WHERE user_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id.to_string()], |row| {
                    Ok(row_to_conversation(row))
                })
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let mut conversations = Vec::new();
            for row in rows {
                let conversation = row.map_err(|e| HuddleError::Storage(e.to_string()))??;
                conversations.push(conversation);
            }
            Ok(conversations)
        })
    }
}

/// Repository for messages.
pub struct MessageRepository {
    db: Arc<Database>,
}

impl MessageRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append a message to a conversation.
    pub fn create(
        &self,
        conversation_id: Uuid,
        author: Author,
        content: &str,
    ) -> Result<Message, HuddleError> {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            author,
            content: content.to_string(),
            created_at: stored_now(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, conversation_id, author, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.conversation_id.to_string(),
                    message.author.as_str(),
                    message.content,
                    message.created_at.timestamp_millis(),
                ],
            )
            .map_err(|e| HuddleError::Storage(format!("Failed to save message: {}", e)))?;
            Ok(())
        })?;
        debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            author = %author,
            "Message stored"
        );
        Ok(message)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Message>, HuddleError> {
        self.db.with_conn(|conn| {
            let result = conn
                .query_row(
                    "SELECT id, conversation_id, author, content, created_at
                     FROM messages WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                    |row| Ok(row_to_message(row)),
                )
                .optional()
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            result.transpose()
        })
    }

    /// Messages of a conversation ordered by creation time, ties in insertion order.
    pub fn list_by_conversation(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<Message>, HuddleError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, conversation_id, author, content, created_at
                     FROM messages
                     WHERE conversation_id = ?1
                     ORDER BY created_at ASC, rowid ASC",
                )
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![conversation_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| HuddleError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Replace the content of a message in place.
    ///
    /// Returns `false` when no message has that id.
    pub fn update_content(&self, id: Uuid, content: &str) -> Result<bool, HuddleError> {
        self.db.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE messages SET content = ?1 WHERE id = ?2",
                    rusqlite::params![content, id.to_string()],
                )
                .map_err(|e| HuddleError::Storage(format!("Failed to update message: {}", e)))?;
            Ok(updated > 0)
        })
    }
}

// =============================================================================
// Row mapping helpers
// =============================================================================

/// Current time at the precision the schema stores (milliseconds).
fn stored_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_uuid(s: &str) -> Result<Uuid, HuddleError> {
    Uuid::parse_str(s).map_err(|e| HuddleError::Storage(format!("Invalid UUID '{}': {}", s, e)))
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, HuddleError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| HuddleError::Storage(format!("Invalid timestamp: {}", ms)))
}

fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, HuddleError> {
    let id: String = row.get(0).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let username: String = row.get(1).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(2).map_err(|e| HuddleError::Storage(e.to_string()))?;

    Ok(User {
        id: parse_uuid(&id)?,
        username,
        created_at: from_millis(created_at)?,
    })
}

fn row_to_conversation(row: &rusqlite::Row<'_>) -> Result<Conversation, HuddleError> {
    let id: String = row.get(0).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let user_id: String = row.get(1).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let topic: String = row.get(2).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(3).map_err(|e| HuddleError::Storage(e.to_string()))?;

    Ok(Conversation {
        id: parse_uuid(&id)?,
        user_id: parse_uuid(&user_id)?,
        topic,
        created_at: from_millis(created_at)?,
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<Message, HuddleError> {
    let id: String = row.get(0).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let conversation_id: String = row.get(1).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let author: String = row.get(2).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let content: String = row.get(3).map_err(|e| HuddleError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(4).map_err(|e| HuddleError::Storage(e.to_string()))?;

    Ok(Message {
        id: parse_uuid(&id)?,
        conversation_id: parse_uuid(&conversation_id)?,
        author: Author::parse(&author)
            .ok_or_else(|| HuddleError::Storage(format!("Unknown author '{}'", author)))?,
        content,
        created_at: from_millis(created_at)?,
    })
}
