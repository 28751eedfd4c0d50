//! Counting queries for the admin statistics endpoint.

use std::collections::BTreeMap;
use std::sync::Arc;

use huddle_core::error::HuddleError;
use huddle_core::types::ChatStats;

use crate::db::Database;

/// Aggregate row counts across all tables.
pub struct StatsQuery {
    db: Arc<Database>,
}

impl StatsQuery {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Count users, conversations and messages, plus conversations per topic.
    ///
    /// Only topics with at least one conversation appear in `topic_counts`.
    pub fn stats(&self) -> Result<ChatStats, HuddleError> {
        self.db.with_conn(|conn| {
            let user_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let conversation_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM conversations", [], |row| row.get(0))
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let message_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                .map_err(|e| HuddleError::Storage(e.to_string()))?;

            let mut stmt = conn
                .prepare("SELECT topic, COUNT(*) FROM conversations GROUP BY topic")
                .map_err(|e| HuddleError::Storage(format!("Topic stats prepare: {}", e)))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(|e| HuddleError::Storage(format!("Topic stats query: {}", e)))?;

            let mut topic_counts = BTreeMap::new();
            for row in rows {
                let (topic, count) = row.map_err(|e| HuddleError::Storage(e.to_string()))?;
                topic_counts.insert(topic, count as u64);
            }

            Ok(ChatStats {
                user_count: user_count as u64,
                conversation_count: conversation_count as u64,
                message_count: message_count as u64,
                topic_counts,
            })
        })
    }
}
