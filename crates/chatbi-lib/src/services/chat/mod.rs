// Chat Service Module
// Turn orchestration, thinking chain, rendering and table sources

pub mod error;
pub mod fixtures;
pub mod orchestrator;
pub mod render;
pub mod source;
pub mod thinking;

pub use error::{ChatError, ChatResult};
pub use fixtures::{Fixture, SUGGESTED_PROMPTS};
pub use orchestrator::{ChatOrchestrator, TurnOutcome};
pub use render::{render_conversation, render_message, ConversationItem, RenderedMessage};
pub use source::{
    create_table_source, BoxedTableSource, FixtureTableSource, TableSource, WorkflowTableSource,
};
pub use thinking::{ChainToken, ThinkingChain};
