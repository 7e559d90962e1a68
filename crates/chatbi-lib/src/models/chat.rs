// Chat data models
// Conversation messages, their stored form, and per-turn progress

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One row of tabular data, keyed by column name (insertion order preserved)
pub type DataRow = serde_json::Map<String, serde_json::Value>;

/// Content of the assistant's table message
pub const TABLE_MESSAGE_CONTENT: &str = "Here is the table data";

/// Content of the assistant's visualization message
pub const VISUALIZATION_MESSAGE_CONTENT: &str = "Here is the visualization";

// ============================================================================
// Messages
// ============================================================================

/// Message author role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            _ => Err(format!("Invalid message role: {}", s)),
        }
    }
}

/// Typed body of a message.
///
/// The wire tag keeps the front-end's discriminator names, so a
/// visualization serializes as `"ava"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePayload {
    /// Plain text rendered as markdown
    Markdown,
    /// Tabular result; `None` when the query returned nothing usable
    Table {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Vec<DataRow>>,
    },
    /// Chart insight derived from a dataset
    #[serde(rename = "ava")]
    Visualization {
        #[serde(default)]
        data: Vec<DataRow>,
    },
}

impl MessagePayload {
    /// Discriminator name as used on the wire
    pub fn type_name(&self) -> &'static str {
        match self {
            MessagePayload::Markdown => "markdown",
            MessagePayload::Table { .. } => "table",
            MessagePayload::Visualization { .. } => "ava",
        }
    }
}

/// A single conversation message, immutable once appended to the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    pub payload: MessagePayload,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            payload: MessagePayload::Markdown,
        }
    }

    /// Create the assistant's table message
    pub fn table(data: Option<Vec<DataRow>>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: TABLE_MESSAGE_CONTENT.to_string(),
            payload: MessagePayload::Table { data },
        }
    }

    /// Create the assistant's visualization message
    pub fn visualization(data: Vec<DataRow>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: VISUALIZATION_MESSAGE_CONTENT.to_string(),
            payload: MessagePayload::Visualization { data },
        }
    }

    /// Tabular data attached to this message, if any
    pub fn data(&self) -> Option<&[DataRow]> {
        match &self.payload {
            MessagePayload::Markdown => None,
            MessagePayload::Table { data } => data.as_deref(),
            MessagePayload::Visualization { data } => Some(data.as_slice()),
        }
    }
}

/// Message delivery status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Loading,
    Success,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Loading => write!(f, "loading"),
            MessageStatus::Success => write!(f, "success"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loading" => Ok(MessageStatus::Loading),
            "success" => Ok(MessageStatus::Success),
            _ => Err(format!("Invalid message status: {}", s)),
        }
    }
}

/// A message as held by the message store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub message: ChatMessage,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl StoredMessage {
    pub fn new(message: ChatMessage, status: MessageStatus) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message,
            status,
            created_at: Utc::now(),
        }
    }

    /// Shorthand for an already-delivered message
    pub fn success(message: ChatMessage) -> Self {
        Self::new(message, MessageStatus::Success)
    }

    pub fn is_loading(&self) -> bool {
        self.status == MessageStatus::Loading
    }
}

// ============================================================================
// Turn progress
// ============================================================================

/// Cosmetic stage of the current turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Sending,
    Thinking,
    Generating,
    #[default]
    Complete,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::Sending => write!(f, "sending"),
            ProcessingStage::Thinking => write!(f, "thinking"),
            ProcessingStage::Generating => write!(f, "generating"),
            ProcessingStage::Complete => write!(f, "complete"),
        }
    }
}

/// One simulated reasoning step shown while a turn is in flight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingStep {
    pub id: String,
    pub content: String,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
}

impl ThinkingStep {
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        let timestamp = Utc::now().timestamp_millis();
        Self {
            id: format!("step-{}-{}", timestamp, index),
            content: content.into(),
            timestamp,
        }
    }
}

/// Snapshot of the in-flight turn's cosmetic state
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnProgress {
    pub stage: ProcessingStage,
    pub is_generating_thinking: bool,
    pub thinking_chain: Vec<ThinkingStep>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> DataRow {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_payload_wire_names() {
        let viz = ChatMessage::visualization(vec![row(json!({"a": 1}))]);
        let value = serde_json::to_value(&viz).unwrap();
        assert_eq!(value["payload"]["type"], "ava");
        assert_eq!(viz.payload.type_name(), "ava");

        let table = ChatMessage::table(None);
        let value = serde_json::to_value(&table).unwrap();
        assert_eq!(value["payload"]["type"], "table");
        assert!(value["payload"].get("data").is_none());
    }

    #[test]
    fn test_message_data_accessor() {
        let rows = vec![row(json!({"name": "a"}))];
        assert!(ChatMessage::user("hi").data().is_none());
        assert!(ChatMessage::table(None).data().is_none());
        assert_eq!(ChatMessage::table(Some(rows.clone())).data(), Some(rows.as_slice()));
        assert_eq!(ChatMessage::visualization(Vec::new()).data().map(|d| d.len()), Some(0));
    }

    #[test]
    fn test_role_and_status_parse() {
        assert_eq!("Assistant".parse::<MessageRole>().unwrap(), MessageRole::Assistant);
        assert!("tool".parse::<MessageRole>().is_err());
        assert_eq!("loading".parse::<MessageStatus>().unwrap(), MessageStatus::Loading);
        assert_eq!(MessageStatus::Success.to_string(), "success");
    }

    #[test]
    fn test_thinking_step_id_format() {
        let step = ThinkingStep::new(3, "content");
        assert!(step.id.starts_with("step-"));
        assert!(step.id.ends_with("-3"));
        assert_eq!(step.id, format!("step-{}-3", step.timestamp));
    }

    #[test]
    fn test_progress_defaults_to_complete() {
        let progress = TurnProgress::default();
        assert_eq!(progress.stage, ProcessingStage::Complete);
        assert!(!progress.is_generating_thinking);
        assert!(progress.thinking_chain.is_empty());
    }
}
