//! Database schema migrations.
//!
//! Applies the initial schema: users, conversations, messages and the
//! schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use huddle_core::error::HuddleError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), HuddleError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| HuddleError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| HuddleError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
///
/// Timestamps are milliseconds since the Unix epoch. Tables keep their
/// implicit rowid, which orders rows created within the same millisecond.
fn apply_v1(conn: &Connection) -> Result<(), HuddleError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY NOT NULL,
            username    TEXT NOT NULL UNIQUE,
            created_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL,
            topic       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_user
            ON conversations (user_id, created_at ASC);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY NOT NULL,
            conversation_id TEXT NOT NULL,
            author          TEXT NOT NULL
                            CHECK (author IN ('user', 'bot')),
            content         TEXT NOT NULL DEFAULT '',
            created_at      INTEGER NOT NULL,
            FOREIGN KEY (conversation_id) REFERENCES conversations(id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages (conversation_id, created_at ASC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| HuddleError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_username_unique() {
        let conn = open_test_conn();
        conn.execute(
            "INSERT INTO users (id, username, created_at) VALUES ('u-1', 'alice', 0)",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO users (id, username, created_at) VALUES ('u-2', 'alice', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_conversation_requires_existing_user() {
        let conn = open_test_conn();
        let result = conn.execute(
            "INSERT INTO conversations (id, user_id, topic, created_at)
             VALUES ('c-1', 'missing', 'rugby', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_message_requires_existing_conversation() {
        let conn = open_test_conn();
        let result = conn.execute(
            "INSERT INTO messages (id, conversation_id, author, content, created_at)
             VALUES ('m-1', 'missing', 'user', 'hi', 0)",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_message_author_check() {
        let conn = open_test_conn();
        conn.execute_batch(
            "INSERT INTO users (id, username, created_at) VALUES ('u-1', 'alice', 0);
             INSERT INTO conversations (id, user_id, topic, created_at) VALUES ('c-1', 'u-1', 'rugby', 0);",
        )
        .unwrap();

        let ok = conn.execute(
            "INSERT INTO messages (id, conversation_id, author, content, created_at)
             VALUES ('m-1', 'c-1', 'bot', '', 0)",
            [],
        );
        assert!(ok.is_ok());

        let bad = conn.execute(
            "INSERT INTO messages (id, conversation_id, author, content, created_at)
             VALUES ('m-2', 'c-1', 'true', 'hi', 0)",
            [],
        );
        assert!(bad.is_err());
    }
}
