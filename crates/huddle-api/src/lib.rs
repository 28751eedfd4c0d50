//! Huddle API crate - axum HTTP server, route handlers, streamed replies.
//!
//! Exposes user registration, the chat and streaming chat endpoints,
//! conversation history, admin statistics and a ping health check.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
