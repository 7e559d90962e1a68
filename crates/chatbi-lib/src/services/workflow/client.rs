// Workflow HTTP Client
// Wraps POST {base_url}/v1/workflows/run with defaults, timeout and error-body decoding

use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{WorkflowError, WorkflowResult};
use crate::models::workflow::{
    ApiErrorResponse, ResponseMode, WorkflowConfig, WorkflowRunRequest, WorkflowRunResponse,
};
use crate::utils::config::{AppConfig, DEFAULT_DIFY_API_URL};

/// Path of the run endpoint, appended to the base URL
pub const RUN_PATH: &str = "/v1/workflows/run";

/// End-user identifier used when the request does not name one
pub const DEFAULT_USER: &str = "abc-123";

/// Header-phase timeout used when the request does not name one
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Client-level defaults merged under every request
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDefaults {
    pub base_url: String,
    pub response_mode: ResponseMode,
    pub user: String,
    pub timeout_ms: u64,
}

impl Default for WorkflowDefaults {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DIFY_API_URL.to_string(),
            response_mode: ResponseMode::Streaming,
            user: DEFAULT_USER.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// A request with every field resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub url: String,
    pub api_key: String,
    pub body: WorkflowRunRequest,
    pub timeout_ms: u64,
}

/// Workflow API client
#[derive(Clone)]
pub struct WorkflowClient {
    defaults: WorkflowDefaults,
    client: Client,
}

impl WorkflowClient {
    pub fn new(defaults: WorkflowDefaults) -> Self {
        Self {
            defaults,
            client: Client::new(),
        }
    }

    /// Client for the application's configured endpoint
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(WorkflowDefaults {
            base_url: config.workflow_base_url().to_string(),
            timeout_ms: config.timeout_ms,
            ..Default::default()
        })
    }

    pub fn defaults(&self) -> &WorkflowDefaults {
        &self.defaults
    }

    /// Merge a request config over the client defaults
    pub fn resolve(&self, config: &WorkflowConfig) -> WorkflowResult<ResolvedRequest> {
        if config.api_key.trim().is_empty() {
            return Err(WorkflowError::MissingApiKey);
        }

        let base_url = config.base_url.as_deref().unwrap_or(&self.defaults.base_url);

        Ok(ResolvedRequest {
            url: api_url(base_url),
            api_key: config.api_key.clone(),
            body: WorkflowRunRequest {
                inputs: config.inputs.clone().unwrap_or_default(),
                response_mode: config.response_mode.unwrap_or(self.defaults.response_mode),
                user: config.user.clone().unwrap_or_else(|| self.defaults.user.clone()),
            },
            timeout_ms: config.timeout_ms.unwrap_or(self.defaults.timeout_ms),
        })
    }

    /// Build the POST for a resolved request
    pub(crate) fn request_builder(
        &self,
        request: &ResolvedRequest,
    ) -> WorkflowResult<RequestBuilder> {
        Ok(self
            .client
            .post(&request.url)
            .headers(auth_headers(&request.api_key)?)
            .json(&request.body))
    }

    /// Issue one workflow run and return the raw response.
    ///
    /// The timeout covers the request until response headers arrive; the
    /// body is left for the caller to consume.
    pub async fn run_workflow(&self, config: &WorkflowConfig) -> WorkflowResult<Response> {
        let request = self.resolve(config)?;
        let builder = self.request_builder(&request)?;

        log::debug!(
            "[workflow] POST {} (mode={}, user={})",
            request.url,
            request.body.response_mode,
            request.body.user
        );

        let timeout = Duration::from_millis(request.timeout_ms);
        let response = tokio::time::timeout(timeout, builder.send())
            .await
            .map_err(|_| {
                log::warn!("[workflow] Request timed out after {}ms", request.timeout_ms);
                WorkflowError::Timeout(request.timeout_ms)
            })??;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        Ok(response)
    }

    /// Run in blocking mode and decode the run result
    pub async fn run_blocking(
        &self,
        config: &WorkflowConfig,
    ) -> WorkflowResult<WorkflowRunResponse> {
        let config = config.clone().with_response_mode(ResponseMode::Blocking);
        let response = self.run_workflow(&config).await?;
        handle_json_response(response).await
    }

    /// The application's data query: blocking mode with `{ "query": query }`
    pub async fn query_core_data(
        &self,
        api_key: &str,
        user: &str,
        query: &str,
    ) -> WorkflowResult<WorkflowRunResponse> {
        let config = WorkflowConfig::new(api_key)
            .with_input("query", query)
            .with_user(user);
        self.run_blocking(&config).await
    }
}

/// `{base}/v1/workflows/run`, ignoring trailing slashes on the base
pub fn api_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), RUN_PATH)
}

fn auth_headers(api_key: &str) -> WorkflowResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| WorkflowError::InvalidConfig(format!("Invalid API key header: {}", e)))?,
    );
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Ok(headers)
}

/// Decode a whole response body as JSON
pub async fn handle_json_response<T: DeserializeOwned>(response: Response) -> WorkflowResult<T> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(WorkflowError::EmptyBody);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

/// Turn a non-success response into an API error.
///
/// The message is the first non-empty of `detail`, `message`, `error`; a
/// non-JSON body counts as `detail`.
pub(crate) async fn error_from_response(response: Response) -> WorkflowError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let body = ApiErrorResponse::from_body(&text);

    let message = body.best_message().unwrap_or_else(|| {
        format!(
            "Request failed: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string()
    });

    log::warn!("[workflow] API error {}: {}", status.as_u16(), message);

    WorkflowError::Api {
        status: status.as_u16(),
        message,
    }
}
