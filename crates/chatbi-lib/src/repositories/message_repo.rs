// Chat Message Repository
// Ordered, append-only conversation log backed by the chat_messages table

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::models::chat::{ChatMessage, MessagePayload, MessageRole, MessageStatus, StoredMessage};
use crate::utils::database::Database;

const SELECT_COLUMNS: &str = "SELECT id, role, content, payload, status, created_at FROM chat_messages";

/// Repository for conversation messages
#[derive(Clone)]
pub struct MessageRepository {
    db: Database,
}

impl MessageRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Append a message to the end of the log
    pub fn append(&self, message: &StoredMessage) -> Result<(), String> {
        let payload = serde_json::to_string(&message.message.payload)
            .map_err(|e| format!("Failed to serialize message payload: {}", e))?;

        self.db.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO chat_messages (id, role, content, payload, status, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    message.id,
                    message.message.role.to_string(),
                    message.message.content,
                    payload,
                    message.status.to_string(),
                    message.created_at.to_rfc3339(),
                ],
            )
            .map_err(|e| format!("Failed to append message: {}", e))?;
            Ok(())
        })
    }

    /// All messages in insertion order
    pub fn list(&self) -> Result<Vec<StoredMessage>, String> {
        self.db.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!("{} ORDER BY seq ASC", SELECT_COLUMNS))
                .map_err(|e| format!("Failed to prepare statement: {}", e))?;

            let rows = stmt
                .query_map([], MessageRow::from_row)
                .map_err(|e| format!("Failed to query messages: {}", e))?;

            let mut messages = Vec::new();
            for row in rows {
                let row = row.map_err(|e| format!("Failed to read row: {}", e))?;
                messages.push(row.into_message()?);
            }
            Ok(messages)
        })
    }

    /// The most recent `limit` messages, still in insertion order
    pub fn list_recent(&self, limit: usize) -> Result<Vec<StoredMessage>, String> {
        let mut messages = self.list()?;
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.split_off(skip))
    }

    /// Get a message by ID
    pub fn get(&self, id: &str) -> Result<Option<StoredMessage>, String> {
        self.db.with_connection(|conn| {
            let result = conn.query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                MessageRow::from_row,
            );

            match result {
                Ok(row) => Ok(Some(row.into_message()?)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(format!("Failed to get message: {}", e)),
            }
        })
    }

    /// Update a message's status. Returns false when the ID is unknown.
    pub fn update_status(&self, id: &str, status: MessageStatus) -> Result<bool, String> {
        self.db.with_connection(|conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE chat_messages SET status = ?1 WHERE id = ?2",
                    params![status.to_string(), id],
                )
                .map_err(|e| format!("Failed to update message status: {}", e))?;
            Ok(rows_affected > 0)
        })
    }

    /// Remove every message, returning how many were deleted
    pub fn clear(&self) -> Result<usize, String> {
        self.db.with_connection(|conn| {
            conn.execute("DELETE FROM chat_messages", [])
                .map_err(|e| format!("Failed to clear messages: {}", e))
        })
    }

    pub fn count(&self) -> Result<i64, String> {
        self.db.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM chat_messages", [], |row| row.get(0))
                .map_err(|e| format!("Failed to count messages: {}", e))
        })
    }
}

/// Internal row struct for chat_messages
struct MessageRow {
    id: String,
    role: String,
    content: String,
    payload: String,
    status: String,
    created_at: String,
}

impl MessageRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            role: row.get(1)?,
            content: row.get(2)?,
            payload: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    fn into_message(self) -> Result<StoredMessage, String> {
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| format!("Invalid role: {}", e))?;
        let status: MessageStatus = self
            .status
            .parse()
            .map_err(|e: String| format!("Invalid status: {}", e))?;
        let payload: MessagePayload = serde_json::from_str(&self.payload)
            .map_err(|e| format!("Invalid payload JSON: {}", e))?;

        Ok(StoredMessage {
            id: self.id,
            message: ChatMessage {
                role,
                content: self.content,
                payload,
            },
            status,
            created_at: DateTime::parse_from_rfc3339(&self.created_at)
                .map_err(|e| format!("Invalid created_at: {}", e))?
                .with_timezone(&Utc),
        })
    }
}
