//! MCP Server modules for ChatBI
//!
//! Tool parameter types and the shared server state. The tool router itself
//! lives in `mcp_server.rs`.

pub mod state;
pub mod types;


pub use state::ServerState;
pub use types::*;

use rmcp::{model::*, ErrorData as McpError};
use serde_json::Value;

/// Wrap a tool outcome as pretty JSON text content.
///
/// Domain failures become an error result carrying `{ code, error }` so the
/// caller sees them; only serialization failures are protocol errors.
pub fn to_call_result(result: Result<Value, ToolError>) -> Result<CallToolResult, McpError> {
    match result {
        Ok(value) => {
            let json = serde_json::to_string_pretty(&value)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::success(vec![Content::text(json)]))
        }
        Err(err) => {
            log::warn!("[mcp] Tool failed ({}): {}", err.code, err.error);
            let json = serde_json::to_string_pretty(&err)
                .map_err(|e| McpError::internal_error(e.to_string(), None))?;
            Ok(CallToolResult::error(vec![Content::text(json)]))
        }
    }
}
