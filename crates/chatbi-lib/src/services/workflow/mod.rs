// Workflow Service Module
// Client for the external workflow run API: single runs, streaming,
// server-sent events, parallel batches and retry

pub mod batch;
pub mod client;
pub mod error;
pub mod events;
pub mod retry;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_support;

pub use batch::{BatchFailure, BatchResult, BatchSuccess, BatchSummary};
pub use client::{handle_json_response, WorkflowClient, WorkflowDefaults};
pub use error::{WorkflowError, WorkflowErrorCode, WorkflowResult};
pub use retry::retry_with_backoff;
pub use stream::{handle_streaming_response, StreamCollector, StreamObserver, Utf8ChunkDecoder};
