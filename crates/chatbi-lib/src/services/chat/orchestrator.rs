// Chat Orchestrator
// Drives one conversational turn: user message, table answer, visualization

use serde::Serialize;

use super::source::BoxedTableSource;
use super::thinking::ThinkingChain;
use super::{ChatError, ChatResult};
use crate::models::chat::{ChatMessage, StoredMessage, TurnProgress};
use crate::repositories::MessageRepository;

/// Messages appended by one submission
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub user_message: StoredMessage,
    pub table_message: StoredMessage,
    pub visualization_message: StoredMessage,
}

pub struct ChatOrchestrator {
    repo: MessageRepository,
    source: BoxedTableSource,
    thinking: ThinkingChain,
}

impl ChatOrchestrator {
    pub fn new(repo: MessageRepository, source: BoxedTableSource) -> Self {
        Self::with_thinking(repo, source, ThinkingChain::new())
    }

    pub fn with_thinking(
        repo: MessageRepository,
        source: BoxedTableSource,
        thinking: ThinkingChain,
    ) -> Self {
        Self {
            repo,
            source,
            thinking,
        }
    }

    /// Submit user input and run the turn.
    ///
    /// Empty or whitespace-only input is ignored and yields `Ok(None)`;
    /// anything else is stored as typed. On failure the thinking chain is
    /// stopped and the error returned; messages already appended stay in the
    /// log. A turn only stops the chain it started, so a newer overlapping
    /// turn keeps its progress.
    pub async fn submit(&self, content: &str) -> ChatResult<Option<TurnOutcome>> {
        if content.trim().is_empty() {
            return Ok(None);
        }

        let token = self.thinking.start().await;

        let user_message = StoredMessage::success(ChatMessage::user(content));
        if let Err(e) = self.append(&user_message) {
            self.thinking.stop(token).await;
            return Err(e);
        }

        let result = self.run_turn(content).await;
        self.thinking.stop(token).await;

        match result {
            Ok((table_message, visualization_message)) => Ok(Some(TurnOutcome {
                user_message,
                table_message,
                visualization_message,
            })),
            Err(e) => {
                log::error!("[chat] Turn failed: {}", e);
                Err(e)
            }
        }
    }

    async fn run_turn(&self, query: &str) -> ChatResult<(StoredMessage, StoredMessage)> {
        log::info!("[chat] Running turn via {} source", self.source.name());

        let rows = self.source.fetch_rows(query).await?;

        let table_message = StoredMessage::success(ChatMessage::table(rows.clone()));
        self.append(&table_message)?;

        let visualization_message =
            StoredMessage::success(ChatMessage::visualization(rows.unwrap_or_default()));
        self.append(&visualization_message)?;

        Ok((table_message, visualization_message))
    }

    fn append(&self, message: &StoredMessage) -> ChatResult<()> {
        self.repo.append(message).map_err(ChatError::Storage)
    }

    /// The ordered message log
    pub fn messages(&self) -> ChatResult<Vec<StoredMessage>> {
        self.repo.list().map_err(ChatError::Storage)
    }

    /// The most recent `limit` messages
    pub fn recent_messages(&self, limit: usize) -> ChatResult<Vec<StoredMessage>> {
        self.repo.list_recent(limit).map_err(ChatError::Storage)
    }

    /// Empty the log, returning how many messages were removed
    pub async fn clear_messages(&self) -> ChatResult<usize> {
        self.thinking.reset().await;
        let removed = self.repo.clear().map_err(ChatError::Storage)?;
        log::info!("[chat] Cleared {} messages", removed);
        Ok(removed)
    }

    pub async fn progress(&self) -> TurnProgress {
        self.thinking.snapshot().await
    }
}
