//! Chat engine for Huddle.
//!
//! The conversation manager validates requests, persists user and bot
//! messages and reads history back. The streaming responder wraps the same
//! flow in a word-by-word chunk stream.

pub mod error;
pub mod manager;
pub mod stream;

pub use error::ChatError;
pub use manager::{ConversationManager, SubmitOutcome};
pub use stream::{ChunkStream, StreamHeader, StreamingResponder};
