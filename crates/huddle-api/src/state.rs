//! Application state shared across all route handlers.

use std::sync::Arc;

use huddle_chat::{ConversationManager, StreamingResponder};
use huddle_core::catalog::ResponseCatalog;
use huddle_core::config::HuddleConfig;
use huddle_storage::Database;

/// Shared application state.
///
/// All fields are cheap to clone; handlers receive a copy per request.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration (file, env and CLI overrides applied).
    pub config: Arc<HuddleConfig>,
    /// Users, conversations and messages.
    pub manager: Arc<ConversationManager>,
    /// Word-by-word replies for `/chat/stream`.
    pub responder: StreamingResponder,
}

impl AppState {
    /// Wire the manager and streaming responder over one database.
    pub fn new(config: HuddleConfig, database: Database, catalog: ResponseCatalog) -> Self {
        let manager = Arc::new(ConversationManager::new(
            Arc::new(database),
            Arc::new(catalog),
        ));
        let responder = StreamingResponder::new(Arc::clone(&manager), config.stream.word_delay());
        Self {
            config: Arc::new(config),
            manager,
            responder,
        }
    }
}
