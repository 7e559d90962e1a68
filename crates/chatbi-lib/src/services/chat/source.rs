// Table data sources
// The external workflow query, or a bundled dataset when none is configured

use async_trait::async_trait;

use super::fixtures::Fixture;
use super::ChatResult;
use crate::models::chat::DataRow;
use crate::services::workflow::WorkflowClient;
use crate::utils::config::AppConfig;

/// Trait for turn data sources
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Rows answering `query`; `None` when the answer carried no table
    async fn fetch_rows(&self, query: &str) -> ChatResult<Option<Vec<DataRow>>>;
}

/// Boxed table source type
pub type BoxedTableSource = Box<dyn TableSource>;

/// Rows from the workflow's `data.outputs.data[0].result`
pub struct WorkflowTableSource {
    client: WorkflowClient,
    api_key: String,
    user: String,
}

impl WorkflowTableSource {
    pub fn new(client: WorkflowClient, api_key: String, user: String) -> Self {
        Self {
            client,
            api_key,
            user,
        }
    }
}

#[async_trait]
impl TableSource for WorkflowTableSource {
    fn name(&self) -> &str {
        "workflow"
    }

    async fn fetch_rows(&self, query: &str) -> ChatResult<Option<Vec<DataRow>>> {
        let response = self
            .client
            .query_core_data(&self.api_key, &self.user, query)
            .await?;

        let rows = response.table_rows();
        match &rows {
            Some(rows) => log::info!("[chat] Workflow returned {} rows", rows.len()),
            None => log::warn!("[chat] Workflow response has no table result"),
        }
        Ok(rows)
    }
}

/// A bundled dataset, returned for every query
pub struct FixtureTableSource {
    fixture: Fixture,
}

impl FixtureTableSource {
    pub fn new(fixture: Fixture) -> Self {
        Self { fixture }
    }
}

#[async_trait]
impl TableSource for FixtureTableSource {
    fn name(&self) -> &str {
        self.fixture.name()
    }

    async fn fetch_rows(&self, _query: &str) -> ChatResult<Option<Vec<DataRow>>> {
        self.fixture.rows().map(Some)
    }
}

/// Pick the source for the configured environment
pub fn create_table_source(config: &AppConfig, client: WorkflowClient) -> BoxedTableSource {
    match (&config.dify_api_url, &config.dify_api_key) {
        (Some(_), Some(key)) => Box::new(WorkflowTableSource::new(
            client,
            key.clone(),
            config.user.clone(),
        )),
        _ => {
            log::info!("[chat] No workflow endpoint configured, using bundled dataset");
            Box::new(FixtureTableSource::new(Fixture::default()))
        }
    }
}
