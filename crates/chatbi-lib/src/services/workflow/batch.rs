// Parallel workflow execution with partial-failure aggregation

use futures::future::join_all;
use reqwest::Response;
use serde::Serialize;

use super::client::{WorkflowClient, handle_json_response};
use super::WorkflowError;
use crate::models::workflow::{ResponseMode, WorkflowConfig, WorkflowRunResponse};

#[derive(Debug)]
pub struct BatchSuccess<R> {
    /// Position in the submitted batch
    pub index: usize,
    pub config: WorkflowConfig,
    pub response: R,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub index: usize,
    pub config: WorkflowConfig,
    pub error: WorkflowError,
}

/// Outcome of a batch, in submission order within each bucket
#[derive(Debug)]
pub struct BatchResult<R> {
    pub successful_results: Vec<BatchSuccess<R>>,
    pub failed_results: Vec<BatchFailure>,
    pub all_succeeded: bool,
}

impl<R> BatchResult<R> {
    fn from_outcomes(outcomes: Vec<(WorkflowConfig, Result<R, WorkflowError>)>) -> Self {
        let mut successful_results = Vec::new();
        let mut failed_results = Vec::new();

        for (index, (config, outcome)) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(response) => successful_results.push(BatchSuccess { index, config, response }),
                Err(error) => failed_results.push(BatchFailure { index, config, error }),
            }
        }

        let all_succeeded = failed_results.is_empty();
        Self {
            successful_results,
            failed_results,
            all_succeeded,
        }
    }

    pub fn total(&self) -> usize {
        self.successful_results.len() + self.failed_results.len()
    }
}

/// Serializable summary of a batch, for tool output
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary<'a> {
    pub all_succeeded: bool,
    pub successful: Vec<&'a WorkflowRunResponse>,
    pub failed: Vec<BatchFailureSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailureSummary {
    pub index: usize,
    pub code: &'static str,
    pub error: String,
}

impl BatchResult<WorkflowRunResponse> {
    pub fn summary(&self) -> BatchSummary<'_> {
        BatchSummary {
            all_succeeded: self.all_succeeded,
            successful: self.successful_results.iter().map(|s| &s.response).collect(),
            failed: self
                .failed_results
                .iter()
                .map(|failure| BatchFailureSummary {
                    index: failure.index,
                    code: failure.error.code().as_str(),
                    error: failure.error.to_string(),
                })
                .collect(),
        }
    }
}

impl WorkflowClient {
    /// Issue every request concurrently and bucket each outcome.
    ///
    /// Never fails fast; an empty batch is all-succeeded.
    pub async fn run_workflows_in_parallel(
        &self,
        configs: Vec<WorkflowConfig>,
    ) -> BatchResult<Response> {
        log::info!("[workflow] Running batch of {} workflows", configs.len());

        let outcomes = join_all(configs.into_iter().map(|config| async move {
            let outcome = self.run_workflow(&config).await;
            (config, outcome)
        }))
        .await;

        let result = BatchResult::from_outcomes(outcomes);
        if !result.all_succeeded {
            log::warn!(
                "[workflow] Batch finished with {} of {} failed",
                result.failed_results.len(),
                result.total()
            );
        }
        result
    }

    /// Blocking-mode batch whose successes carry decoded run results
    pub async fn run_blocking_in_parallel(
        &self,
        configs: Vec<WorkflowConfig>,
    ) -> BatchResult<WorkflowRunResponse> {
        let outcomes = join_all(configs.into_iter().map(|config| async move {
            let config = config.with_response_mode(ResponseMode::Blocking);
            let outcome = match self.run_workflow(&config).await {
                Ok(response) => handle_json_response(response).await,
                Err(e) => Err(e),
            };
            (config, outcome)
        }))
        .await;

        BatchResult::from_outcomes(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::workflow::client::WorkflowDefaults;
    use crate::services::workflow::test_support::{spawn_server, Recorder};
    use serde_json::json;

    async fn client() -> (WorkflowClient, Recorder) {
        let recorder = Recorder::default();
        let base = spawn_server(recorder.router(json!({"data": {"status": "succeeded", "outputs": {}}}))).await;
        let client = WorkflowClient::new(WorkflowDefaults {
            base_url: base,
            ..Default::default()
        });
        (client, recorder)
    }

    #[tokio::test]
    async fn test_partial_failures_are_bucketed() {
        let (client, recorder) = client().await;
        let configs = vec![
            WorkflowConfig::new("k").with_user("a"),
            WorkflowConfig::new(""),
            WorkflowConfig::new("k").with_user("b"),
            WorkflowConfig::new("").with_user("c"),
        ];

        let result = client.run_workflows_in_parallel(configs).await;

        assert_eq!(result.successful_results.len(), 2);
        assert_eq!(result.failed_results.len(), 2);
        assert!(!result.all_succeeded);
        assert_eq!(result.successful_results[0].config.user.as_deref(), Some("a"));
        assert_eq!(result.successful_results[1].config.user.as_deref(), Some("b"));
        assert!(result
            .failed_results
            .iter()
            .all(|f| matches!(f.error, WorkflowError::MissingApiKey)));
        assert_eq!(recorder.count(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch_all_succeeded() {
        let (client, _) = client().await;
        let result = client.run_workflows_in_parallel(Vec::new()).await;
        assert!(result.all_succeeded);
        assert_eq!(result.total(), 0);
    }

    #[tokio::test]
    async fn test_blocking_batch_summary() {
        let (client, _) = client().await;
        let configs = vec![WorkflowConfig::new(""), WorkflowConfig::new("k"), WorkflowConfig::new("")];

        let result = client.run_blocking_in_parallel(configs).await;
        assert_eq!(result.successful_results.len(), 1);
        assert_eq!(
            result.successful_results[0].response.data.status.as_deref(),
            Some("succeeded")
        );

        assert_eq!(result.successful_results[0].index, 1);

        let summary = result.summary();
        let indexes: Vec<usize> = summary.failed.iter().map(|f| f.index).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert_eq!(summary.failed[0].code, "WORKFLOW_MISSING_API_KEY");
    }
}
