//! Conversation manager: validates chat requests and persists both sides
//! of every exchange.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_core::catalog::ResponseCatalog;
use huddle_core::error::HuddleError;
use huddle_core::types::{Author, ChatStats, Conversation, ConversationThread, Message, User};
use huddle_storage::{ConversationRepository, Database, MessageRepository, StatsQuery, UserRepository};

use crate::error::ChatError;

/// Result of a successful [`ConversationManager::submit_message`].
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The stored bot reply.
    pub bot_message: Message,
    /// Conversation the exchange was recorded under.
    pub conversation_id: Uuid,
}

/// Business logic over the store and the response catalog.
///
/// Both collaborators are injected at construction. Every write is its own
/// statement; concurrent submissions to one conversation may interleave.
pub struct ConversationManager {
    users: UserRepository,
    conversations: ConversationRepository,
    messages: MessageRepository,
    stats: StatsQuery,
    catalog: Arc<ResponseCatalog>,
}

impl ConversationManager {
    pub fn new(db: Arc<Database>, catalog: Arc<ResponseCatalog>) -> Self {
        Self {
            users: UserRepository::new(Arc::clone(&db)),
            conversations: ConversationRepository::new(Arc::clone(&db)),
            messages: MessageRepository::new(Arc::clone(&db)),
            stats: StatsQuery::new(db),
            catalog,
        }
    }

    pub fn catalog(&self) -> &ResponseCatalog {
        &self.catalog
    }

    /// Register a new user. The username is trimmed and must be unique.
    pub fn register_user(&self, username: &str) -> Result<User, ChatError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ChatError::InvalidUsername);
        }
        match self.users.create(username) {
            Ok(user) => {
                info!(user_id = %user.id, username, "User registered");
                Ok(user)
            }
            Err(HuddleError::Duplicate(_)) => Err(ChatError::UsernameTaken(username.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User, ChatError> {
        self.users
            .find_by_id(user_id)?
            .ok_or(ChatError::UserNotFound(user_id))
    }

    /// Record a user message and a canned bot reply.
    ///
    /// With `conversation_id`, the conversation must belong to `user_id`.
    /// Without one, a new conversation is opened for the topic. Nothing is
    /// written when validation fails.
    pub fn submit_message(
        &self,
        user_id: Uuid,
        topic: &str,
        content: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<SubmitOutcome, ChatError> {
        self.ensure_user(user_id)?;
        let topic = self.normalize_topic(topic)?;

        let conversation = match conversation_id {
            Some(id) => self
                .conversations
                .find_owned(id, user_id)?
                .ok_or(ChatError::ConversationNotFound(id))?,
            None => self.conversations.create(user_id, &topic)?,
        };

        self.messages.create(conversation.id, Author::User, content)?;

        let reply = self.draw_reply(&topic)?;
        let bot_message = self.messages.create(conversation.id, Author::Bot, &reply)?;

        debug!(
            conversation_id = %conversation.id,
            bot_message_id = %bot_message.id,
            topic = %topic,
            "Message exchange stored"
        );

        Ok(SubmitOutcome {
            bot_message,
            conversation_id: conversation.id,
        })
    }

    /// All conversations of a user with their ordered messages.
    pub fn get_history(&self, user_id: Uuid) -> Result<Vec<ConversationThread>, ChatError> {
        self.ensure_user(user_id)?;
        self.conversations
            .list_by_user(user_id)?
            .into_iter()
            .map(|conversation| self.thread(conversation))
            .collect()
    }

    /// One conversation with its ordered messages.
    pub fn get_conversation(&self, conversation_id: Uuid) -> Result<ConversationThread, ChatError> {
        let conversation = self
            .conversations
            .find_by_id(conversation_id)?
            .ok_or(ChatError::ConversationNotFound(conversation_id))?;
        self.thread(conversation)
    }

    /// Row counts, with every catalog topic present in `topic_counts`.
    pub fn stats(&self) -> Result<ChatStats, ChatError> {
        let mut stats = self.stats.stats()?;
        for topic in self.catalog.topics() {
            stats.topic_counts.entry(topic.to_string()).or_insert(0);
        }
        Ok(stats)
    }

    // -- Crate-internal steps shared with the streaming responder --

    pub(crate) fn ensure_user(&self, user_id: Uuid) -> Result<(), ChatError> {
        if self.users.exists(user_id)? {
            Ok(())
        } else {
            Err(ChatError::UserNotFound(user_id))
        }
    }

    /// Lower-case the topic and check it against the catalog.
    pub(crate) fn normalize_topic(&self, topic: &str) -> Result<String, ChatError> {
        let normalized = topic.trim().to_lowercase();
        if self.catalog.contains(&normalized) {
            Ok(normalized)
        } else {
            Err(ChatError::UnsupportedTopic(normalized))
        }
    }

    /// Reuse the user's conversation when `conversation_id` resolves to one,
    /// otherwise open a new conversation for the topic.
    pub(crate) fn resume_or_open(
        &self,
        user_id: Uuid,
        topic: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<Conversation, ChatError> {
        if let Some(id) = conversation_id {
            if let Some(conversation) = self.conversations.find_owned(id, user_id)? {
                return Ok(conversation);
            }
            warn!(
                conversation_id = %id,
                user_id = %user_id,
                "Conversation not found for user, starting a new one"
            );
        }
        Ok(self.conversations.create(user_id, topic)?)
    }

    pub(crate) fn append(
        &self,
        conversation_id: Uuid,
        author: Author,
        content: &str,
    ) -> Result<Message, ChatError> {
        Ok(self.messages.create(conversation_id, author, content)?)
    }

    pub(crate) fn draw_reply(&self, topic: &str) -> Result<String, ChatError> {
        self.catalog
            .pick(topic)
            .map(str::to_string)
            .ok_or_else(|| ChatError::UnsupportedTopic(topic.to_string()))
    }

    /// Overwrite a bot placeholder. Returns `false` if the message is gone.
    pub(crate) fn finalize_reply(&self, message_id: Uuid, content: &str) -> Result<bool, ChatError> {
        Ok(self.messages.update_content(message_id, content)?)
    }

    fn thread(&self, conversation: Conversation) -> Result<ConversationThread, ChatError> {
        let messages = self.messages.list_by_conversation(conversation.id)?;
        Ok(ConversationThread {
            conversation,
            messages,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (ConversationManager, Arc<Database>) {
        let db = Arc::new(Database::in_memory().unwrap());
        let manager =
            ConversationManager::new(Arc::clone(&db), Arc::new(ResponseCatalog::builtin()));
        (manager, db)
    }

    fn counts(manager: &ConversationManager) -> (u64, u64) {
        let stats = manager.stats().unwrap();
        (stats.conversation_count, stats.message_count)
    }

    // ---- Users ----

    #[test]
    fn test_register_and_get_user() {
        let (manager, _) = setup();
        let user = manager.register_user("  alice  ").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(manager.get_user(user.id).unwrap().username, "alice");
    }

    #[test]
    fn test_register_empty_username() {
        let (manager, _) = setup();
        assert!(matches!(
            manager.register_user("   "),
            Err(ChatError::InvalidUsername)
        ));
    }

    #[test]
    fn test_register_duplicate_username() {
        let (manager, _) = setup();
        manager.register_user("alice").unwrap();
        match manager.register_user("alice") {
            Err(ChatError::UsernameTaken(name)) => assert_eq!(name, "alice"),
            other => panic!("Expected UsernameTaken, got {:?}", other),
        }
    }

    #[test]
    fn test_get_unknown_user() {
        let (manager, _) = setup();
        let id = Uuid::new_v4();
        assert!(matches!(manager.get_user(id), Err(ChatError::UserNotFound(u)) if u == id));
    }

    // ---- submit_message ----

    #[test]
    fn test_submit_new_conversation_rugby() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();

        let outcome = manager
            .submit_message(user.id, "rugby", "Salut", None)
            .unwrap();

        assert_eq!(counts(&manager), (1, 2));
        assert_eq!(outcome.bot_message.author, Author::Bot);
        assert!(!outcome.bot_message.content.is_empty());
        let rugby = manager.catalog().get("rugby").unwrap();
        assert_eq!(rugby.len(), 4);
        assert!(rugby.iter().any(|r| *r == outcome.bot_message.content));

        let history = manager.get_history(user.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].conversation.id, outcome.conversation_id);
        assert_eq!(history[0].conversation.topic, "rugby");
    }

    #[test]
    fn test_submit_normalizes_topic_case() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        let outcome = manager
            .submit_message(user.id, "TeNNis", "Qui sert ?", None)
            .unwrap();

        let thread = manager.get_conversation(outcome.conversation_id).unwrap();
        assert_eq!(thread.conversation.topic, "tennis");
    }

    #[test]
    fn test_submit_existing_conversation() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        let first = manager
            .submit_message(user.id, "football", "Bonjour", None)
            .unwrap();

        let second = manager
            .submit_message(user.id, "football", "Encore", Some(first.conversation_id))
            .unwrap();

        assert_eq!(second.conversation_id, first.conversation_id);
        assert_eq!(counts(&manager), (1, 4));

        let thread = manager.get_conversation(first.conversation_id).unwrap();
        let authors: Vec<Author> = thread.messages.iter().map(|m| m.author).collect();
        assert_eq!(
            authors,
            vec![Author::User, Author::Bot, Author::User, Author::Bot]
        );
        assert_eq!(thread.messages[2].content, "Encore");
    }

    #[test]
    fn test_submit_unknown_user() {
        let (manager, _) = setup();
        let id = Uuid::new_v4();
        for topic in ["rugby", "badminton"] {
            let err = manager.submit_message(id, topic, "Salut", None).unwrap_err();
            assert!(matches!(err, ChatError::UserNotFound(u) if u == id));
        }
        assert_eq!(counts(&manager), (0, 0));
    }

    #[test]
    fn test_submit_unsupported_topic_writes_nothing() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();

        let err = manager
            .submit_message(user.id, "badminton", "Salut", None)
            .unwrap_err();

        assert!(matches!(err, ChatError::UnsupportedTopic(ref t) if t == "badminton"));
        assert_eq!(counts(&manager), (0, 0));
    }

    #[test]
    fn test_submit_foreign_conversation_is_not_found() {
        let (manager, _) = setup();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        let alice_conv = manager
            .submit_message(alice.id, "volley", "Hello", None)
            .unwrap()
            .conversation_id;

        let err = manager
            .submit_message(bob.id, "volley", "Hi", Some(alice_conv))
            .unwrap_err();

        assert!(matches!(err, ChatError::ConversationNotFound(c) if c == alice_conv));
        assert_eq!(counts(&manager), (1, 2));
    }

    #[test]
    fn test_submit_unknown_conversation_is_not_found() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        let err = manager
            .submit_message(user.id, "rugby", "Salut", Some(Uuid::new_v4()))
            .unwrap_err();
        assert!(matches!(err, ChatError::ConversationNotFound(_)));
        assert_eq!(counts(&manager), (0, 0));
    }

    // ---- History and conversation reads ----

    #[test]
    fn test_history_unknown_user() {
        let (manager, _) = setup();
        assert!(matches!(
            manager.get_history(Uuid::new_v4()),
            Err(ChatError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_history_empty_for_new_user() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        assert!(manager.get_history(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_history_messages_sorted() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        let conv = manager
            .submit_message(user.id, "cyclisme", "1", None)
            .unwrap()
            .conversation_id;
        for i in 2..6 {
            manager
                .submit_message(user.id, "cyclisme", &i.to_string(), Some(conv))
                .unwrap();
        }
        manager.submit_message(user.id, "rugby", "x", None).unwrap();

        let history = manager.get_history(user.id).unwrap();
        assert_eq!(history.len(), 2);
        for thread in &history {
            assert!(thread
                .messages
                .windows(2)
                .all(|w| w[0].created_at <= w[1].created_at));
        }
        let user_texts: Vec<&str> = history[0]
            .messages
            .iter()
            .filter(|m| m.author.is_user())
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(user_texts, vec!["1", "2", "3", "4", "5"]);
    }

    #[test]
    fn test_history_only_contains_own_conversations() {
        let (manager, _) = setup();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        manager.submit_message(alice.id, "rugby", "a", None).unwrap();
        manager.submit_message(bob.id, "tennis", "b", None).unwrap();

        let history = manager.get_history(bob.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].conversation.user_id, bob.id);
    }

    #[test]
    fn test_get_conversation_unknown() {
        let (manager, _) = setup();
        assert!(matches!(
            manager.get_conversation(Uuid::new_v4()),
            Err(ChatError::ConversationNotFound(_))
        ));
    }

    #[test]
    fn test_get_fresh_conversation_has_no_messages() {
        let (manager, db) = setup();
        let user = manager.register_user("alice").unwrap();
        let conv = ConversationRepository::new(db).create(user.id, "rugby").unwrap();

        let thread = manager.get_conversation(conv.id).unwrap();
        assert!(thread.messages.is_empty());
    }

    // ---- Stats ----

    #[test]
    fn test_stats_lists_every_catalog_topic() {
        let (manager, _) = setup();
        let user = manager.register_user("alice").unwrap();
        manager.submit_message(user.id, "rugby", "a", None).unwrap();

        let stats = manager.stats().unwrap();
        assert_eq!(stats.user_count, 1);
        assert_eq!(stats.conversation_count, 1);
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.topic_counts.len(), 5);
        assert_eq!(stats.topic_counts["rugby"], 1);
        assert_eq!(stats.topic_counts["tennis"], 0);
    }

    // ---- Stream helpers ----

    #[test]
    fn test_resume_or_open_falls_back_to_new_conversation() {
        let (manager, _) = setup();
        let alice = manager.register_user("alice").unwrap();
        let bob = manager.register_user("bob").unwrap();
        let alice_conv = manager
            .submit_message(alice.id, "rugby", "a", None)
            .unwrap()
            .conversation_id;

        let reused = manager
            .resume_or_open(alice.id, "rugby", Some(alice_conv))
            .unwrap();
        assert_eq!(reused.id, alice_conv);

        let fresh = manager
            .resume_or_open(bob.id, "rugby", Some(alice_conv))
            .unwrap();
        assert_ne!(fresh.id, alice_conv);
        assert_eq!(fresh.user_id, bob.id);
    }
}
