use clap::Parser;

/// Terminal chat with an LLM that calls tools on a remote MCP server.
///
/// Without `--server` the CLI talks to the tool server and Gemini directly
/// and keeps history in memory. With `--server` it becomes a thin client of
/// the relay chat API, sharing sessions with every other client.
#[derive(Parser, Debug)]
#[command(name = "relay-cli", version, about = "Chat with tools over MCP")]
pub struct CliArgs {
    /// Relay server URL for remote mode (e.g. http://localhost:8000)
    #[arg(long, env = "RELAY_SERVER_URL")]
    pub server: Option<String>,

    /// Continue an existing session by ID
    #[arg(long)]
    pub session: Option<String>,

    /// List the server's sessions and exit
    #[arg(long, requires = "server")]
    pub list_sessions: bool,

    /// Maximum tool calls per message (local mode; defaults to CHAT_MAX_ITERATIONS)
    #[arg(long)]
    pub max_iterations: Option<usize>,

    /// MCP server SSE URL (local mode; defaults to MCP_SERVER_URL)
    #[arg(long)]
    pub mcp_url: Option<String>,

    /// Gemini model override (local mode; defaults to GEMINI_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// System prompt override (local mode)
    #[arg(long)]
    pub system_prompt: Option<String>,
}

impl CliArgs {
    /// Apply command-line overrides on top of the environment config.
    pub fn apply_to(&self, config: &mut relay_core::Config) {
        if let Some(url) = &self.mcp_url {
            config.mcp.server_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.llm.gemini_model = model.clone();
        }
        if let Some(max) = self.max_iterations {
            config.chat.max_iterations = max;
        }
        if self.system_prompt.is_some() {
            config.llm.system_prompt = self.system_prompt.clone();
        }
    }
}
