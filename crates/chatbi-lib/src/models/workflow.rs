// Workflow API models
// Request configuration, retry policy, and response shapes of the workflow run endpoint

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::chat::DataRow;

/// How the server delivers the run result
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    #[default]
    Streaming,
    Blocking,
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseMode::Streaming => write!(f, "streaming"),
            ResponseMode::Blocking => write!(f, "blocking"),
        }
    }
}

impl std::str::FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "streaming" => Ok(ResponseMode::Streaming),
            "blocking" => Ok(ResponseMode::Blocking),
            other => Err(format!("Unknown response mode: {}", other)),
        }
    }
}

/// Per-request parameters. Unset fields fall back to the client defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowConfig {
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<serde_json::Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl WorkflowConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_inputs(mut self, inputs: serde_json::Map<String, Value>) -> Self {
        self.inputs = Some(inputs);
        self
    }

    /// Set a single input field
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs
            .get_or_insert_with(serde_json::Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_response_mode(mut self, mode: ResponseMode) -> Self {
        self.response_mode = Some(mode);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// JSON body sent to the run endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WorkflowRunRequest {
    pub inputs: serde_json::Map<String, Value>,
    pub response_mode: ResponseMode,
    pub user: String,
}

/// Retry policy for `run_workflow_with_retry`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 1000,
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    /// Delay to wait after the zero-based `attempt` fails
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let ms = if self.exponential_backoff {
            self.retry_delay_ms
                .saturating_mul(2u64.saturating_pow(attempt))
        } else {
            self.retry_delay_ms
        };
        std::time::Duration::from_millis(ms)
    }
}

/// Error body returned by the API on non-success status
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ApiErrorResponse {
    /// Decode a raw error body.
    ///
    /// A JSON object maps onto the known fields, other JSON values carry no
    /// message, and anything that is not JSON becomes `detail`.
    pub fn from_body(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => serde_json::from_value(value).unwrap_or_default(),
            Ok(_) => Self::default(),
            Err(_) => Self::from_text(text),
        }
    }

    /// Wrap a non-JSON body
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            detail: Some(Value::String(text.into())),
            ..Default::default()
        }
    }

    /// First non-empty of `detail`, `message`, `error`
    pub fn best_message(&self) -> Option<String> {
        [&self.detail, &self.message, &self.error]
            .into_iter()
            .flatten()
            .find_map(value_text)
    }
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// One server-sent event of a streaming run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowEvent {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl WorkflowEvent {
    pub fn is_finished(&self) -> bool {
        self.event == "workflow_finished"
    }
}

/// Blocking-mode run result
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRunResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default)]
    pub data: WorkflowRunData,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRunData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub outputs: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl WorkflowRunResponse {
    /// Rows at `data.outputs.data[0].result`.
    ///
    /// The result is either a JSON array or a string holding one.
    pub fn table_rows(&self) -> Option<Vec<DataRow>> {
        let result = self.data.outputs.get("data")?.get(0)?.get("result")?;
        let parsed;
        let array = match result {
            Value::Array(items) => items,
            Value::String(text) => {
                parsed = serde_json::from_str::<Value>(text).ok()?;
                parsed.as_array()?
            }
            _ => return None,
        };
        Some(
            array
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
        )
    }
}
