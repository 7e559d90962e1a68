//! Type definitions for MCP tool parameters and responses
//!
//! Parameter structs derive `JsonSchema` so the router can publish them.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use chatbi_lib::models::workflow::{ResponseMode, RetryConfig, WorkflowConfig};

// ============================================================================
// Chat Tools
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// The natural-language data question, e.g. "查询 7 天订单趋势"
    pub question: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListMessagesParams {
    /// Only return the most recent N messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Return rendered bodies (table columns, visualization fields) instead of raw payloads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<bool>,
}

// ============================================================================
// Workflow Tools
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RetryParams {
    /// Total attempts including the first (default: 3)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    /// Base delay between attempts in milliseconds (default: 1000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_delay_ms: Option<u64>,
    /// Double the delay after each failed attempt (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponential_backoff: Option<bool>,
}

impl RetryParams {
    pub fn into_retry_config(self) -> RetryConfig {
        let defaults = RetryConfig::default();
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_delay_ms: self.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            exponential_backoff: self.exponential_backoff.unwrap_or(defaults.exponential_backoff),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RunWorkflowParams {
    /// Workflow input variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<serde_json::Map<String, serde_json::Value>>,
    /// "blocking" or "streaming" (default: streaming)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,
    /// End-user identifier sent with the run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Override the configured API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Timeout in milliseconds until response headers arrive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Override the configured API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Retry policy; omitted means a single attempt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryParams>,
}

impl RunWorkflowParams {
    /// Build the request config, falling back to `default_api_key`
    pub fn to_workflow_config(
        &self,
        default_api_key: Option<&str>,
    ) -> Result<WorkflowConfig, String> {
        let api_key = self
            .api_key
            .as_deref()
            .or(default_api_key)
            .unwrap_or_default();

        let response_mode = self
            .response_mode
            .as_deref()
            .map(str::parse::<ResponseMode>)
            .transpose()?;

        Ok(WorkflowConfig {
            api_key: api_key.to_string(),
            inputs: self.inputs.clone(),
            response_mode,
            user: self.user.clone(),
            base_url: self.base_url.clone(),
            timeout_ms: self.timeout_ms,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RunWorkflowBatchParams {
    /// Runs to execute concurrently in blocking mode
    pub runs: Vec<RunWorkflowParams>,
}

// ============================================================================
// Response Types
// ============================================================================

/// Error body of a failed tool call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolError {
    pub code: String,
    pub error: String,
}

impl ToolError {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
        }
    }
}

impl From<chatbi_lib::services::chat::ChatError> for ToolError {
    fn from(err: chatbi_lib::services::chat::ChatError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

impl From<chatbi_lib::services::workflow::WorkflowError> for ToolError {
    fn from(err: chatbi_lib::services::workflow::WorkflowError) -> Self {
        Self::new(err.code().as_str(), err.to_string())
    }
}
