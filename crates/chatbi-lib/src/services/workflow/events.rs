// Server-sent event stream of a streaming workflow run

use async_stream::try_stream;
use futures::{Stream, StreamExt, TryStreamExt};
use reqwest_eventsource::{Event, EventSource, retry::Never};
use std::time::Duration;

use super::client::{WorkflowClient, error_from_response};
use super::{WorkflowError, WorkflowResult};
use crate::models::workflow::{ResponseMode, WorkflowConfig, WorkflowEvent};

impl WorkflowClient {
    /// Run the workflow in streaming mode and yield its parsed events.
    ///
    /// The client timeout applies until the stream opens. The stream ends
    /// when the server closes it; there is no reconnection.
    pub fn stream_events(
        &self,
        config: &WorkflowConfig,
    ) -> impl Stream<Item = WorkflowResult<WorkflowEvent>> + Send + 'static {
        let client = self.clone();
        let config = config.clone().with_response_mode(ResponseMode::Streaming);

        try_stream! {
            let request = client.resolve(&config)?;
            let builder = client.request_builder(&request)?;

            let mut source = EventSource::new(builder)
                .map_err(|e| WorkflowError::InvalidConfig(e.to_string()))?;
            source.set_retry_policy(Box::new(Never));

            log::debug!("[workflow] Opening event stream {}", request.url);

            let timeout = Duration::from_millis(request.timeout_ms);
            let mut next = tokio::time::timeout(timeout, source.next())
                .await
                .map_err(|_| WorkflowError::Timeout(request.timeout_ms))?;

            while let Some(item) = next {
                match item {
                    Ok(Event::Open) => log::debug!("[workflow] Event stream open"),
                    Ok(Event::Message(message)) => {
                        // Keep-alive pings carry no payload
                        if !message.data.trim().is_empty() {
                            let event: WorkflowEvent = serde_json::from_str(&message.data)?;
                            log::debug!("[workflow] Event {}", event.event);
                            yield event;
                        }
                    }
                    Err(reqwest_eventsource::Error::StreamEnded) => break,
                    Err(reqwest_eventsource::Error::InvalidStatusCode(_, response)) => {
                        source.close();
                        Err(error_from_response(response).await)?;
                    }
                    Err(reqwest_eventsource::Error::InvalidContentType(content_type, _)) => {
                        source.close();
                        Err(WorkflowError::Stream(format!(
                            "Unexpected content type: {}",
                            content_type.to_str().unwrap_or("<binary>")
                        )))?;
                    }
                    Err(reqwest_eventsource::Error::Transport(e)) => {
                        source.close();
                        Err(WorkflowError::from(e))?;
                    }
                    Err(other) => {
                        source.close();
                        Err(WorkflowError::Stream(other.to_string()))?;
                    }
                }
                next = source.next().await;
            }

            source.close();
        }
    }

    /// Drain the event stream of one run
    pub async fn collect_events(
        &self,
        config: &WorkflowConfig,
    ) -> WorkflowResult<Vec<WorkflowEvent>> {
        self.stream_events(config).try_collect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::workflow::client::{RUN_PATH, WorkflowDefaults};
    use crate::services::workflow::test_support::{chunked_router, spawn_server};
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::json;

    fn client_for(base_url: String) -> WorkflowClient {
        WorkflowClient::new(WorkflowDefaults {
            base_url,
            ..Default::default()
        })
    }

    fn sse(events: &[serde_json::Value]) -> Vec<Vec<u8>> {
        let mut chunks: Vec<Vec<u8>> = vec![b"event: ping\n\n".to_vec()];
        for event in events {
            chunks.push(format!("data: {}\n\n", event).into_bytes());
        }
        chunks
    }

    #[tokio::test]
    async fn test_stream_events_in_order() {
        let chunks = sse(&[
            json!({"event": "workflow_started", "task_id": "t1", "workflow_run_id": "r1", "data": {"id": "r1"}}),
            json!({"event": "node_finished", "task_id": "t1", "workflow_run_id": "r1", "data": {"node_id": "n1"}}),
            json!({"event": "workflow_finished", "task_id": "t1", "workflow_run_id": "r1", "data": {"status": "succeeded"}}),
        ]);
        let base = spawn_server(chunked_router("text/event-stream", chunks)).await;

        let events = client_for(base)
            .collect_events(&WorkflowConfig::new("k"))
            .await
            .unwrap();

        let names: Vec<&str> = events.iter().map(|e| e.event.as_str()).collect();
        assert_eq!(names, vec!["workflow_started", "node_finished", "workflow_finished"]);
        assert!(events[2].is_finished());
        assert_eq!(events[0].task_id.as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn test_stream_events_status_error() {
        let app = Router::new().route(
            RUN_PATH,
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"code": "unauthorized", "message": "Access token is invalid"})),
                )
            }),
        );
        let base = spawn_server(app).await;

        let err = client_for(base)
            .collect_events(&WorkflowConfig::new("bad"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.to_string(), "Access token is invalid");
    }

    #[tokio::test]
    async fn test_stream_events_missing_key() {
        let err = client_for("http://127.0.0.1:9".to_string())
            .collect_events(&WorkflowConfig::new(" "))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingApiKey));
    }

    #[tokio::test]
    async fn test_stream_events_invalid_payload() {
        let chunks = vec![b"data: not-json\n\n".to_vec()];
        let base = spawn_server(chunked_router("text/event-stream", chunks)).await;

        let err = client_for(base)
            .collect_events(&WorkflowConfig::new("k"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Parse(_)));
    }
}
