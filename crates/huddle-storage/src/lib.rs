//! Huddle Storage crate - SQLite persistence for users, conversations and messages.
//!
//! Provides a WAL-mode SQLite database with migrations, one repository per
//! table, and the counting queries behind the admin statistics endpoint.

pub mod db;
pub mod migrations;
pub mod queries;
pub mod repository;

pub use db::Database;
pub use queries::StatsQuery;
pub use repository::{ConversationRepository, MessageRepository, UserRepository};
