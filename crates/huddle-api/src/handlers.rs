//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path or body parameters via axum extractors, calls
//! the conversation manager (or streaming responder) and renders JSON.

use std::collections::BTreeMap;
use std::convert::Infallible;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use huddle_core::types::{ChatStats, ConversationThread, Message, User};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

/// Body of POST /users.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
}

/// Body of POST /chat and POST /chat/stream.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub user_id: Uuid,
    pub sport: String,
    pub content: String,
    #[serde(default)]
    pub conversation_id: Option<Uuid>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub ping: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub content: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            content: message.content,
            is_user: message.author.is_user(),
            created_at: message.created_at,
        }
    }
}

/// Reply to POST /chat: the bot message plus the conversation it joined.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub message: MessageResponse,
    pub conversation_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub id: Uuid,
    pub sport: String,
    pub messages: Vec<MessageResponse>,
    pub created_at: DateTime<Utc>,
}

impl From<ConversationThread> for ConversationResponse {
    fn from(thread: ConversationThread) -> Self {
        Self {
            id: thread.conversation.id,
            sport: thread.conversation.topic,
            messages: thread.messages.into_iter().map(Into::into).collect(),
            created_at: thread.conversation.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub user_count: u64,
    pub conversation_count: u64,
    pub message_count: u64,
    pub sport_stats: BTreeMap<String, u64>,
}

impl From<ChatStats> for StatsResponse {
    fn from(stats: ChatStats) -> Self {
        Self {
            user_count: stats.user_count,
            conversation_count: stats.conversation_count,
            message_count: stats.message_count,
            sport_stats: stats.topic_counts,
        }
    }
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /ping - liveness check.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        ping: "pong!".to_string(),
    })
}

/// POST /users - register a user.
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state.manager.register_user(&body.username)?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.manager.get_user(user_id)?;
    Ok(Json(user.into()))
}

/// POST /chat - store the user message and a canned reply.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let outcome = state.manager.submit_message(
        body.user_id,
        &body.sport,
        &body.content,
        body.conversation_id,
    )?;
    Ok(Json(ChatResponse {
        message: outcome.bot_message.into(),
        conversation_id: outcome.conversation_id,
    }))
}

/// POST /chat/stream - plain-text body: a JSON header line, then the reply
/// word by word.
///
/// Always answers 200; validation failures arrive as a single text chunk.
pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let chunks = state
        .responder
        .start_stream(
            body.user_id,
            &body.sport,
            &body.content,
            body.conversation_id,
        )
        .map(Ok::<_, Infallible>);

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(chunks),
    )
        .into_response()
}

/// GET /history/{user_id} - every conversation of the user with messages.
pub async fn history(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<ConversationResponse>>, ApiError> {
    let threads = state.manager.get_history(user_id)?;
    Ok(Json(threads.into_iter().map(Into::into).collect()))
}

/// GET /conversation/{conversation_id}
pub async fn conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<ConversationResponse>, ApiError> {
    let thread = state.manager.get_conversation(conversation_id)?;
    Ok(Json(thread.into()))
}

/// GET /admin/stats - row counts and conversations per sport.
pub async fn admin_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.manager.stats()?;
    Ok(Json(stats.into()))
}
