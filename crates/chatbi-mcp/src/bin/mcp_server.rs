// ChatBI MCP Server
// Exposes the conversational BI turn and the workflow client as MCP tools
//
// Run with: cargo run --bin chatbi-mcp
// Or install: cargo install --path crates/chatbi-mcp --bin chatbi-mcp
//
// Messages and the login session are stored in SQLite (WAL mode). Logs go to
// stderr; stdout carries the MCP transport.

mod mcp;

use std::sync::Arc;

use rmcp::{
    ErrorData as McpError,
    ServerHandler,
    handler::server::tool::{ToolCallContext, ToolRouter},
    handler::server::wrapper::Parameters,
    model::*,
    service::RequestContext,
    tool, tool_router,
};
use tokio::io::{stdin, stdout};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tracing_subscriber::EnvFilter;

use chatbi_lib::AppConfig;

use mcp::{
    to_call_result, AskParams, ListMessagesParams, RunWorkflowBatchParams, RunWorkflowParams,
    ServerState,
};

#[derive(Clone)]
pub struct ChatBiMcp {
    /// Tool router for handling tool calls
    tool_router: ToolRouter<Self>,
    state: Arc<ServerState>,
}

impl ChatBiMcp {
    pub fn new(state: ServerState) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state: Arc::new(state),
        }
    }
}

#[tool_router]
impl ChatBiMcp {
    // ========================================================================
    // Chat Tools
    // ========================================================================

    #[tool(description = "Ask a data question. Appends the question, a table answer and a visualization to the conversation and returns them. Blank questions are ignored.")]
    async fn ask(
        &self,
        Parameters(params): Parameters<AskParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.ask(&params.question).await)
    }

    #[tool(description = "List the conversation messages in order. Use limit for the most recent N and rendered=true for table columns and visualization fields.")]
    async fn list_messages(
        &self,
        Parameters(params): Parameters<ListMessagesParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.list_messages(&params))
    }

    #[tool(description = "Clear the conversation and stop any running thinking chain")]
    async fn clear_messages(&self) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.clear_messages().await)
    }

    #[tool(description = "Get the current turn's processing stage and thinking chain")]
    async fn get_progress(&self) -> Result<CallToolResult, McpError> {
        to_call_result(Ok(self.state.progress().await))
    }

    #[tool(description = "List suggested starter questions to pass to ask")]
    async fn list_prompts(&self) -> Result<CallToolResult, McpError> {
        to_call_result(Ok(self.state.prompts()))
    }

    // ========================================================================
    // Workflow Tools
    // ========================================================================

    #[tool(description = "Run the external workflow once. Blocking mode returns the run result and extracted table rows; streaming mode returns the received events. Optional retry with back-off.")]
    async fn run_workflow(
        &self,
        Parameters(params): Parameters<RunWorkflowParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.run_workflow(&params).await)
    }

    #[tool(description = "Run several workflows concurrently in blocking mode. Individual failures are reported per run without failing the batch.")]
    async fn run_workflow_batch(
        &self,
        Parameters(params): Parameters<RunWorkflowBatchParams>,
    ) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.run_workflow_batch(&params).await)
    }

    // ========================================================================
    // Session Tools
    // ========================================================================

    #[tool(description = "Get the signed-in user's profile, or an empty profile when signed out")]
    async fn get_session(&self) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.get_session())
    }

    #[tool(description = "Sign out by removing the stored token and user profile")]
    async fn logout(&self) -> Result<CallToolResult, McpError> {
        to_call_result(self.state.logout())
    }
}

impl ServerHandler for ChatBiMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
                ..Default::default()
            },
            server_info: Implementation {
                name: "chatbi-mcp".to_string(),
                title: Some("ChatBI MCP Server".to_string()),
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some("ChatBI MCP Server answers data questions with a table and a visualization, and runs the configured workflow API directly.".to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        async move {
            Ok(ListToolsResult {
                tools: self.tool_router.list_all(),
                next_cursor: None,
            })
        }
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<rmcp::RoleServer>,
    ) -> impl std::future::Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            log::debug!("[mcp] call_tool {}", request.name);
            let tool_context = ToolCallContext::new(self, request, context);
            self.tool_router.call(tool_context).await
        }
    }
}

/// Tool names and one-line descriptions, as printed by `--list-tools`
const TOOLS: [(&str, &str); 9] = [
    ("ask", "Ask a data question, get a table and a visualization"),
    ("list_messages", "List conversation messages (raw or rendered)"),
    ("clear_messages", "Clear the conversation"),
    ("get_progress", "Get the processing stage and thinking chain"),
    ("list_prompts", "List suggested starter questions"),
    ("run_workflow", "Run the workflow API once (blocking or streaming)"),
    ("run_workflow_batch", "Run several workflows concurrently"),
    ("get_session", "Get the signed-in user profile"),
    ("logout", "Remove the stored login session"),
];

/// Print help information about available MCP tools
fn print_help() {
    let version = env!("CARGO_PKG_VERSION");
    println!(r#"ChatBI MCP Server v{}

USAGE:
    chatbi-mcp [OPTIONS]

OPTIONS:
    --help, -h      Print this help information
    --version, -v   Print version information
    --list-tools    List all available MCP tools

DESCRIPTION:
    ChatBI MCP Server lets AI assistants ask data questions in natural
    language. Each question is answered with a table and a visualization,
    backed by the configured workflow API or a bundled dataset.

MCP TOOLS:

  CHAT
    ask                 Ask a data question
    list_messages       List conversation messages
    clear_messages      Clear the conversation
    get_progress        Get the processing stage and thinking chain
    list_prompts        List suggested starter questions

  WORKFLOW
    run_workflow        Run the workflow API once
    run_workflow_batch  Run several workflows concurrently

  SESSION
    get_session         Get the signed-in user profile
    logout              Remove the stored login session

ENVIRONMENT:
    DIFY_API_URL        Workflow API base URL
    DIFY_API_KEY        Workflow API key
    CHATBI_USER         End-user identifier for data queries
    CHATBI_TIMEOUT_MS   Request timeout in milliseconds
    CHATBI_DB_PATH      SQLite database path
    CHATBI_CONFIG       Path to config.toml
    RUST_LOG            Log filter (default: info)

EXAMPLES:
    # Claude Code configuration (~/.claude.json)
    {{
      "mcpServers": {{
        "chatbi": {{
          "command": "chatbi-mcp",
          "env": {{ "DIFY_API_URL": "https://api.dify.ai", "DIFY_API_KEY": "app-..." }}
        }}
      }}
    }}
"#, version);
}

fn print_version() {
    println!("chatbi-mcp {}", env!("CARGO_PKG_VERSION"));
}

/// List all tools in a simple format
fn list_tools_simple() {
    println!("ChatBI MCP Tools:\n");
    for (name, desc) in TOOLS {
        println!("  {:<25} {}", name, desc);
    }
    println!();
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the `info` default
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true)
        .try_init();

    if let Err(e) = result {
        eprintln!("[MCP Server] Failed to initialize logging: {}", e);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    for arg in &args[1..] {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            "--version" | "-v" => {
                print_version();
                return Ok(());
            }
            "--list-tools" => {
                list_tools_simple();
                return Ok(());
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                eprintln!("Use --help for usage information");
                std::process::exit(1);
            }
        }
    }

    init_logging();
    log::info!("[mcp] Starting ChatBI MCP Server (PID: {})", std::process::id());

    let config = AppConfig::load()?;
    if config.has_external_workflow() {
        log::info!("[mcp] Workflow endpoint: {}", config.workflow_base_url());
    }

    let state = ServerState::open(config)?;
    let server = ChatBiMcp::new(state);

    // Run with stdio transport
    let transport = (stdin(), stdout());
    let service = rmcp::serve_server(server, transport).await?;

    // Set up signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    {
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sighup = signal(SignalKind::hangup())?;

        tokio::select! {
            result = service.waiting() => {
                match result {
                    Ok(_) => log::info!("[mcp] Service ended normally"),
                    Err(e) => log::error!("[mcp] Service ended with error: {:?}", e),
                }
            }
            _ = sigterm.recv() => {
                log::info!("[mcp] Received SIGTERM, shutting down gracefully...");
            }
            _ = sigint.recv() => {
                log::info!("[mcp] Received SIGINT, shutting down gracefully...");
            }
            _ = sighup.recv() => {
                log::info!("[mcp] Received SIGHUP (parent process died), shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        service.waiting().await?;
    }

    log::info!("[mcp] Shutdown complete");
    Ok(())
}
