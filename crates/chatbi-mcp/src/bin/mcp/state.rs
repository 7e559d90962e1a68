//! Server state shared by every tool call
//!
//! Owns the database-backed chat orchestrator, the workflow client and the
//! login session. Tool handlers call into here and only format the result.

use serde_json::{json, Value};

use chatbi_lib::models::session::UserProfile;
use chatbi_lib::models::workflow::{ResponseMode, WorkflowRunResponse};
use chatbi_lib::repositories::{MessageRepository, SettingsRepository};
use chatbi_lib::services::chat::{
    create_table_source, render_conversation, BoxedTableSource, ChatOrchestrator,
    SUGGESTED_PROMPTS,
};
use chatbi_lib::services::session::SessionStore;
use chatbi_lib::services::workflow::{
    handle_json_response, retry_with_backoff, WorkflowClient, WorkflowError,
};
use chatbi_lib::utils::database::open_database;
use chatbi_lib::{AppConfig, Database};

use super::types::{ListMessagesParams, RunWorkflowBatchParams, RunWorkflowParams, ToolError};

/// Code reported when the settings table cannot be read or written
const SESSION_STORAGE_ERROR: &str = "SESSION_STORAGE_ERROR";

pub struct ServerState {
    config: AppConfig,
    client: WorkflowClient,
    orchestrator: ChatOrchestrator,
    session: SessionStore,
}

impl ServerState {
    /// Open the configured database and wire the services
    pub fn open(config: AppConfig) -> Result<Self, String> {
        let db = open_database(config.database_path.clone())?;
        Ok(Self::with_database(config, db))
    }

    pub fn with_database(config: AppConfig, db: Database) -> Self {
        let client = WorkflowClient::from_config(&config);
        let source = create_table_source(&config, client.clone());
        Self::with_source(config, db, client, source)
    }

    pub fn with_source(
        config: AppConfig,
        db: Database,
        client: WorkflowClient,
        source: BoxedTableSource,
    ) -> Self {
        let orchestrator = ChatOrchestrator::new(MessageRepository::new(db.clone()), source);
        let session = SessionStore::new(SettingsRepository::new(db));
        Self {
            config,
            client,
            orchestrator,
            session,
        }
    }

    // ========================================================================
    // Chat
    // ========================================================================

    pub async fn ask(&self, question: &str) -> Result<Value, ToolError> {
        let Some(outcome) = self.orchestrator.submit(question).await? else {
            return Ok(json!({ "ignored": true }));
        };

        let turn = [
            outcome.user_message.clone(),
            outcome.table_message.clone(),
            outcome.visualization_message.clone(),
        ];
        Ok(json!({
            "ignored": false,
            "turn": outcome,
            "rendered": render_conversation(&turn),
        }))
    }

    pub fn list_messages(&self, params: &ListMessagesParams) -> Result<Value, ToolError> {
        let messages = match params.limit {
            Some(limit) => self.orchestrator.recent_messages(limit)?,
            None => self.orchestrator.messages()?,
        };
        let total = messages.len();

        if params.rendered.unwrap_or(false) {
            Ok(json!({ "messages": render_conversation(&messages), "total": total }))
        } else {
            Ok(json!({ "messages": messages, "total": total }))
        }
    }

    pub async fn clear_messages(&self) -> Result<Value, ToolError> {
        let removed = self.orchestrator.clear_messages().await?;
        Ok(json!({ "removed": removed }))
    }

    pub async fn progress(&self) -> Value {
        json!(self.orchestrator.progress().await)
    }

    pub fn prompts(&self) -> Value {
        json!({ "prompts": SUGGESTED_PROMPTS })
    }

    // ========================================================================
    // Workflow
    // ========================================================================

    pub async fn run_workflow(&self, params: &RunWorkflowParams) -> Result<Value, ToolError> {
        let config = params
            .to_workflow_config(self.config.dify_api_key.as_deref())
            .map_err(WorkflowError::InvalidConfig)?;
        let mode = config
            .response_mode
            .unwrap_or(self.client.defaults().response_mode);
        let retry = params.retry.clone().map(|r| r.into_retry_config());

        match mode {
            ResponseMode::Blocking => {
                let response: WorkflowRunResponse = match retry {
                    Some(retry) => {
                        let config = config.with_response_mode(ResponseMode::Blocking);
                        let raw = self.client.run_workflow_with_retry(&config, &retry).await?;
                        handle_json_response(raw).await?
                    }
                    None => self.client.run_blocking(&config).await?,
                };
                let rows = response.table_rows();
                Ok(json!({ "mode": mode, "response": response, "rows": rows }))
            }
            ResponseMode::Streaming => {
                let events = match retry {
                    Some(retry) => {
                        retry_with_backoff(&retry, |_| self.client.collect_events(&config)).await?
                    }
                    None => self.client.collect_events(&config).await?,
                };
                let finished = events.iter().any(|e| e.is_finished());
                Ok(json!({ "mode": mode, "events": events, "finished": finished }))
            }
        }
    }

    /// Blocking runs in parallel; individual failures land in the summary
    pub async fn run_workflow_batch(
        &self,
        params: &RunWorkflowBatchParams,
    ) -> Result<Value, ToolError> {
        let default_key = self.config.dify_api_key.as_deref();
        let configs = params
            .runs
            .iter()
            .map(|run| run.to_workflow_config(default_key))
            .collect::<Result<Vec<_>, String>>()
            .map_err(WorkflowError::InvalidConfig)?;

        let result = self.client.run_blocking_in_parallel(configs).await;
        log::info!(
            "[mcp] Batch finished: {} succeeded, {} failed",
            result.successful_results.len(),
            result.failed_results.len()
        );

        let summary = result.summary();
        Ok(json!({
            "total": result.total(),
            "allSucceeded": summary.all_succeeded,
            "successful": summary.successful,
            "failed": summary.failed,
        }))
    }

    // ========================================================================
    // Session
    // ========================================================================

    pub fn get_session(&self) -> Result<Value, ToolError> {
        let session = self
            .session
            .load()
            .map_err(|e| ToolError::new(SESSION_STORAGE_ERROR, e))?;

        Ok(match session {
            Some(session) => json!({ "authenticated": true, "user": session.user }),
            None => json!({ "authenticated": false, "user": UserProfile::default() }),
        })
    }

    pub fn logout(&self) -> Result<Value, ToolError> {
        let signed_out = self
            .session
            .destroy()
            .map_err(|e| ToolError::new(SESSION_STORAGE_ERROR, e))?;
        Ok(json!({ "signedOut": signed_out }))
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }
}
