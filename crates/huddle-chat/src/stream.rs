//! Word-by-word streaming of a canned reply.
//!
//! A stream starts with a JSON header line naming the bot message and its
//! conversation, then yields the reply one word at a time. Once every word
//! has been yielded the full text is written back to the bot message. If the
//! consumer drops the stream early, that write never happens and the bot
//! message keeps its empty placeholder content.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use huddle_core::error::HuddleError;
use huddle_core::types::Author;

use crate::error::ChatError;
use crate::manager::ConversationManager;

/// Lazily produced text chunks.
pub type ChunkStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// First chunk of every successful stream, followed by a newline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamHeader {
    pub message_id: Uuid,
    pub conversation_id: Uuid,
}

/// Produces chunk streams on top of a [`ConversationManager`].
#[derive(Clone)]
pub struct StreamingResponder {
    manager: Arc<ConversationManager>,
    word_delay: Duration,
}

impl StreamingResponder {
    pub fn new(manager: Arc<ConversationManager>, word_delay: Duration) -> Self {
        Self {
            manager,
            word_delay,
        }
    }

    /// Record the user message and a bot placeholder, then return the
    /// stream that emits the reply.
    ///
    /// Validation failures are not surfaced as errors: the returned stream
    /// consists of a single chunk describing the failure.
    pub fn start_stream(
        &self,
        user_id: Uuid,
        topic: &str,
        content: &str,
        conversation_id: Option<Uuid>,
    ) -> ChunkStream {
        let phase = match self.initiate(user_id, topic, content, conversation_id) {
            Ok(phase) => phase,
            Err(ChatError::UserNotFound(_)) => Phase::Failed("user not found"),
            Err(ChatError::UnsupportedTopic(_)) => Phase::Failed("topic not supported"),
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to start stream");
                Phase::Failed("internal error")
            }
        };

        Box::pin(stream::unfold(phase, advance))
    }

    fn initiate(
        &self,
        user_id: Uuid,
        topic: &str,
        content: &str,
        conversation_id: Option<Uuid>,
    ) -> Result<Phase, ChatError> {
        self.manager.ensure_user(user_id)?;
        let topic = self.manager.normalize_topic(topic)?;

        let conversation = self
            .manager
            .resume_or_open(user_id, &topic, conversation_id)?;
        self.manager
            .append(conversation.id, Author::User, content)?;
        let placeholder = self.manager.append(conversation.id, Author::Bot, "")?;

        let reply = self.manager.draw_reply(&topic)?;
        let header = StreamHeader {
            message_id: placeholder.id,
            conversation_id: conversation.id,
        };
        let mut header_line = serde_json::to_string(&header).map_err(HuddleError::from)?;
        header_line.push('\n');

        debug!(
            message_id = %placeholder.id,
            conversation_id = %conversation.id,
            topic = %topic,
            "Stream initiated"
        );

        Ok(Phase::Header {
            line: header_line,
            emission: Emission {
                manager: Arc::clone(&self.manager),
                message_id: placeholder.id,
                words: reply.split_whitespace().map(str::to_string).collect(),
                next: 0,
                emitted: String::new(),
                delay: self.word_delay,
            },
        })
    }
}

/// Progress of one stream.
enum Phase {
    Header { line: String, emission: Emission },
    Emitting(Emission),
    Finalizing(Emission),
    Failed(&'static str),
    Done,
}

struct Emission {
    manager: Arc<ConversationManager>,
    message_id: Uuid,
    words: Vec<String>,
    next: usize,
    emitted: String,
    delay: Duration,
}

impl Emission {
    fn finalize(&self) {
        let content = self.emitted.trim_end();
        match self.manager.finalize_reply(self.message_id, content) {
            Ok(true) => debug!(message_id = %self.message_id, "Stream finalized"),
            Ok(false) => error!(
                message_id = %self.message_id,
                "Bot message disappeared before finalization"
            ),
            Err(e) => error!(
                message_id = %self.message_id,
                error = %e,
                "Failed to finalize streamed message"
            ),
        }
    }
}

async fn advance(mut phase: Phase) -> Option<(String, Phase)> {
    loop {
        phase = match phase {
            Phase::Header { line, emission } => return Some((line, Phase::Emitting(emission))),
            Phase::Emitting(emission) if emission.next >= emission.words.len() => {
                Phase::Finalizing(emission)
            }
            Phase::Emitting(mut emission) => {
                let chunk = format!("{} ", emission.words[emission.next]);
                if emission.next > 0 && !emission.delay.is_zero() {
                    tokio::time::sleep(emission.delay).await;
                }
                emission.next += 1;
                emission.emitted.push_str(&chunk);
                return Some((chunk, Phase::Emitting(emission)));
            }
            Phase::Finalizing(emission) => {
                emission.finalize();
                Phase::Done
            }
            Phase::Failed(message) => return Some((message.to_string(), Phase::Done)),
            Phase::Done => return None,
        };
    }
}

// =============================================================================
// Tests
// =============================================================================
