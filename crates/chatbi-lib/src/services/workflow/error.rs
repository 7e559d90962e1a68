// Workflow Service Error Types

use thiserror::Error;

/// Workflow client error
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// No API key supplied
    #[error("API key cannot be empty")]
    MissingApiKey,

    /// Invalid client configuration (base URL, header value)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Response headers did not arrive in time
    #[error("Request timed out ({0}ms)")]
    Timeout(u64),

    /// Non-success status; the message comes from the server's error body
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Connection failed
    #[error("Cannot connect to workflow service: {0}")]
    ConnectionFailed(String),

    /// Transport error other than connect/timeout
    #[error("Request failed: {0}")]
    Request(String),

    /// JSON parsing error
    #[error("Response parse error: {0}")]
    Parse(String),

    /// Response carried no body
    #[error("Response has no body")]
    EmptyBody,

    /// Error while reading a streaming body
    #[error("Stream error: {0}")]
    Stream(String),

    /// Retry loop ran zero attempts
    #[error("Retry failed without capturing error")]
    RetryExhausted,
}

impl From<reqwest::Error> for WorkflowError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            WorkflowError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            WorkflowError::Parse(err.to_string())
        } else {
            WorkflowError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(err: serde_json::Error) -> Self {
        WorkflowError::Parse(err.to_string())
    }
}

/// Result type for workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Workflow error codes for callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowErrorCode {
    MissingApiKey,
    InvalidConfig,
    Timeout,
    Api,
    ConnectionFailed,
    Request,
    Parse,
    EmptyBody,
    Stream,
    RetryExhausted,
}

impl WorkflowErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowErrorCode::MissingApiKey => "WORKFLOW_MISSING_API_KEY",
            WorkflowErrorCode::InvalidConfig => "WORKFLOW_INVALID_CONFIG",
            WorkflowErrorCode::Timeout => "WORKFLOW_TIMEOUT",
            WorkflowErrorCode::Api => "WORKFLOW_API_ERROR",
            WorkflowErrorCode::ConnectionFailed => "WORKFLOW_CONNECTION_FAILED",
            WorkflowErrorCode::Request => "WORKFLOW_REQUEST_ERROR",
            WorkflowErrorCode::Parse => "WORKFLOW_PARSE_ERROR",
            WorkflowErrorCode::EmptyBody => "WORKFLOW_EMPTY_BODY",
            WorkflowErrorCode::Stream => "WORKFLOW_STREAM_ERROR",
            WorkflowErrorCode::RetryExhausted => "WORKFLOW_RETRY_EXHAUSTED",
        }
    }
}

impl WorkflowError {
    pub fn code(&self) -> WorkflowErrorCode {
        match self {
            WorkflowError::MissingApiKey => WorkflowErrorCode::MissingApiKey,
            WorkflowError::InvalidConfig(_) => WorkflowErrorCode::InvalidConfig,
            WorkflowError::Timeout(_) => WorkflowErrorCode::Timeout,
            WorkflowError::Api { .. } => WorkflowErrorCode::Api,
            WorkflowError::ConnectionFailed(_) => WorkflowErrorCode::ConnectionFailed,
            WorkflowError::Request(_) => WorkflowErrorCode::Request,
            WorkflowError::Parse(_) => WorkflowErrorCode::Parse,
            WorkflowError::EmptyBody => WorkflowErrorCode::EmptyBody,
            WorkflowError::Stream(_) => WorkflowErrorCode::Stream,
            WorkflowError::RetryExhausted => WorkflowErrorCode::RetryExhausted,
        }
    }

    /// HTTP status for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            WorkflowError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<WorkflowError> for String {
    fn from(err: WorkflowError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(WorkflowError::MissingApiKey.to_string(), "API key cannot be empty");
        assert_eq!(WorkflowError::Timeout(1500).to_string(), "Request timed out (1500ms)");
        let api = WorkflowError::Api {
            status: 400,
            message: "Workflow not published".to_string(),
        };
        assert_eq!(api.to_string(), "Workflow not published");
        assert_eq!(api.status(), Some(400));
    }

    #[test]
    fn test_codes() {
        assert_eq!(WorkflowError::MissingApiKey.code().as_str(), "WORKFLOW_MISSING_API_KEY");
        assert_eq!(WorkflowError::RetryExhausted.code().as_str(), "WORKFLOW_RETRY_EXHAUSTED");
        assert_eq!(WorkflowError::Timeout(1).code(), WorkflowErrorCode::Timeout);
    }
}
