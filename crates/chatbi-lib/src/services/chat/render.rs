// Message rendering
// Pure projection of messages into display bodies, keyed for list rendering

use serde::Serialize;
use serde_json::Value;

use crate::models::chat::{ChatMessage, DataRow, MessagePayload, MessageRole, StoredMessage};

pub const TABLE_WITHOUT_DATA: &str = "Can't render table without data";
pub const NO_VISUALIZATION: &str = "No visualization result found.";

/// Display body of one message
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedMessage {
    Text {
        text: String,
    },
    Table {
        columns: Vec<String>,
        rows: Vec<DataRow>,
    },
    Visualization {
        /// Categorical fields of the first row
        dimensions: Vec<String>,
        /// Numeric fields of the first row
        measures: Vec<String>,
        rows: Vec<DataRow>,
    },
}

impl RenderedMessage {
    fn text(text: impl Into<String>) -> Self {
        RenderedMessage::Text { text: text.into() }
    }
}

/// One entry in the rendered conversation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConversationItem {
    /// `<id>-<index>`
    pub key: String,
    pub role: MessageRole,
    pub loading: bool,
    pub body: RenderedMessage,
}

pub fn render_message(message: &ChatMessage) -> RenderedMessage {
    match &message.payload {
        MessagePayload::Markdown => RenderedMessage::text(message.content.clone()),
        MessagePayload::Table { data: None } => RenderedMessage::text(TABLE_WITHOUT_DATA),
        MessagePayload::Table { data: Some(rows) } => RenderedMessage::Table {
            columns: rows
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
            rows: rows.clone(),
        },
        MessagePayload::Visualization { data } if data.is_empty() => {
            RenderedMessage::text(NO_VISUALIZATION)
        }
        MessagePayload::Visualization { data } => {
            let (measures, dimensions): (Vec<_>, Vec<_>) = data[0]
                .iter()
                .partition(|(_, value)| matches!(value, Value::Number(_)));
            RenderedMessage::Visualization {
                dimensions: dimensions.into_iter().map(|(k, _)| k.clone()).collect(),
                measures: measures.into_iter().map(|(k, _)| k.clone()).collect(),
                rows: data.clone(),
            }
        }
    }
}

pub fn render_conversation(messages: &[StoredMessage]) -> Vec<ConversationItem> {
    messages
        .iter()
        .enumerate()
        .map(|(index, stored)| ConversationItem {
            key: format!("{}-{}", stored.id, index),
            role: stored.message.role,
            loading: stored.is_loading(),
            body: render_message(&stored.message),
        })
        .collect()
}
