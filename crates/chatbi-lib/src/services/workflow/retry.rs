// Retry with exponential back-off

use reqwest::Response;
use std::future::Future;

use super::client::WorkflowClient;
use super::{WorkflowError, WorkflowResult};
use crate::models::workflow::{RetryConfig, WorkflowConfig};

/// Run `op` up to `retry.max_retries` times, sleeping between attempts.
///
/// The last error is returned when every attempt fails. Zero attempts
/// yields `RetryExhausted`.
pub async fn retry_with_backoff<T, F, Fut>(retry: &RetryConfig, mut op: F) -> WorkflowResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = WorkflowResult<T>>,
{
    let mut last_error: Option<WorkflowError> = None;

    for attempt in 0..retry.max_retries {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt + 1 < retry.max_retries {
                    let delay = retry.delay_for_attempt(attempt);
                    log::warn!(
                        "[workflow] Attempt {} failed, retrying in {}ms: {}",
                        attempt + 1,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    log::warn!("[workflow] Attempt {} failed: {}", attempt + 1, e);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(WorkflowError::RetryExhausted))
}

impl WorkflowClient {
    /// `run_workflow` with retries on any failure
    pub async fn run_workflow_with_retry(
        &self,
        config: &WorkflowConfig,
        retry: &RetryConfig,
    ) -> WorkflowResult<Response> {
        retry_with_backoff(retry, |_| self.run_workflow(config)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::workflow::client::WorkflowDefaults;
    use crate::services::workflow::test_support::{spawn_server, Recorder};
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    fn failing(attempts: Arc<Mutex<Vec<Instant>>>) -> impl FnMut(u32) -> std::future::Ready<WorkflowResult<()>> {
        move |attempt| {
            attempts.lock().unwrap().push(Instant::now());
            std::future::ready(Err(WorkflowError::Api {
                status: 503,
                message: format!("attempt {}", attempt),
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts_with_exponential_delays() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let retry = RetryConfig::default();

        let err = retry_with_backoff(&retry, failing(attempts.clone())).await.unwrap_err();
        assert_eq!(err.to_string(), "attempt 2");

        let times = attempts.lock().unwrap().clone();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_millis(1000));
        assert_eq!(times[2] - times[1], Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_delay_and_no_trailing_sleep() {
        let attempts = Arc::new(Mutex::new(Vec::new()));
        let retry = RetryConfig {
            max_retries: 2,
            retry_delay_ms: 250,
            exponential_backoff: false,
        };

        let start = Instant::now();
        retry_with_backoff(&retry, failing(attempts.clone())).await.unwrap_err();

        let times = attempts.lock().unwrap().clone();
        assert_eq!(times[1] - times[0], Duration::from_millis(250));
        assert_eq!(Instant::now() - start, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_zero_retries() {
        let retry = RetryConfig {
            max_retries: 0,
            ..Default::default()
        };
        let err = retry_with_backoff(&retry, |_| async { Ok::<_, WorkflowError>(1) })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::RetryExhausted));
        assert_eq!(err.to_string(), "Retry failed without capturing error");
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let recorder = Recorder::default();
        let base = spawn_server(recorder.flaky_router(2, json!({"ok": true}))).await;
        let client = WorkflowClient::new(WorkflowDefaults {
            base_url: base,
            ..Default::default()
        });
        let retry = RetryConfig {
            retry_delay_ms: 1,
            ..Default::default()
        };

        let response = client
            .run_workflow_with_retry(&WorkflowConfig::new("k"), &retry)
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(recorder.count(), 3);
    }

    #[tokio::test]
    async fn test_surfaces_last_server_error() {
        let recorder = Recorder::default();
        let base = spawn_server(recorder.flaky_router(usize::MAX, json!({}))).await;
        let client = WorkflowClient::new(WorkflowDefaults {
            base_url: base,
            ..Default::default()
        });
        let retry = RetryConfig {
            max_retries: 3,
            retry_delay_ms: 1,
            exponential_backoff: true,
        };

        let err = client
            .run_workflow_with_retry(&WorkflowConfig::new("k"), &retry)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "temporarily unavailable");
        assert_eq!(recorder.count(), 3);
    }
}
