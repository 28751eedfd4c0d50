//! Error types for the chat engine.

use huddle_core::error::HuddleError;
use uuid::Uuid;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("user not found: {0}")]
    UserNotFound(Uuid),
    #[error("conversation not found: {0}")]
    ConversationNotFound(Uuid),
    #[error("topic not supported: {0}")]
    UnsupportedTopic(String),
    #[error("username cannot be empty")]
    InvalidUsername,
    #[error("username already taken: {0}")]
    UsernameTaken(String),
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<HuddleError> for ChatError {
    fn from(err: HuddleError) -> Self {
        ChatError::StorageError(err.to_string())
    }
}
