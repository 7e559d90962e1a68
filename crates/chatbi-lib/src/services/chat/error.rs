// Chat Service Error Types

use thiserror::Error;

use crate::services::workflow::WorkflowError;

/// Chat orchestration error
#[derive(Error, Debug)]
pub enum ChatError {
    /// The external data query failed
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Message store or settings failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Bundled dataset could not be loaded
    #[error("Fixture error: {0}")]
    Fixture(String),
}

/// Result type for chat operations
pub type ChatResult<T> = Result<T, ChatError>;

impl ChatError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ChatError::Workflow(e) => e.code().as_str(),
            ChatError::Storage(_) => "CHAT_STORAGE_ERROR",
            ChatError::Fixture(_) => "CHAT_FIXTURE_ERROR",
        }
    }
}

impl From<ChatError> for String {
    fn from(err: ChatError) -> Self {
        err.to_string()
    }
}
