//! Where a message goes: straight to the tool loop, or to a relay server.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use relay_core::Config;
use relay_mcp::{register_remote_tools, McpConnection};
use relay_tool_runtime::{
    AgenticLoop, InMemorySessionStore, Role, SessionStore, ToolInvoker, ToolRegistry,
};

use crate::server_client::ServerClient;

/// One executed tool call, as shown to the user.
#[derive(Debug, Clone)]
pub struct ToolCallLine {
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub response: String,
    pub session_id: String,
    pub tool_calls: Vec<ToolCallLine>,
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn send(&mut self, message: &str) -> Result<Reply>;

    /// Banner line describing the backend.
    fn describe(&self) -> String;
}

// ── Local ─────────────────────────────────────────────────────────

/// Runs the loop in-process against the configured tool server and model.
pub struct LocalBackend {
    engine: AgenticLoop,
    store: InMemorySessionStore,
    session_id: Option<String>,
    label: String,
}

impl LocalBackend {
    pub fn new(engine: AgenticLoop, session_id: Option<String>, label: String) -> Self {
        Self {
            engine,
            store: InMemorySessionStore::new(),
            session_id,
            label,
        }
    }

    /// Connect to the tool server, discover its tools, and build the loop.
    pub async fn connect(config: &Config, session_id: Option<String>) -> Result<Self> {
        let provider =
            relay_llm::create_provider(&config.llm).context("failed to create LLM provider")?;

        let connection = Arc::new(McpConnection::sse(
            &config.mcp.server_url,
            &config.mcp.client_name,
            Duration::from_secs(config.mcp.request_timeout_secs),
        ));
        let mut registry = ToolRegistry::new();
        register_remote_tools(&mut registry, connection)
            .await
            .with_context(|| format!("failed to reach tool server at {}", config.mcp.server_url))?;

        let label = format!(
            "local | {} {} | {} tools from {}",
            provider.provider_name(),
            config.llm.gemini_model,
            registry.len(),
            config.mcp.server_url
        );
        let engine = AgenticLoop::new(provider, Arc::new(ToolInvoker::new(Arc::new(registry))))
            .with_max_iterations(config.chat.max_iterations)
            .with_max_context_tokens(config.chat.max_context_tokens)
            .with_temperature(config.llm.temperature)
            .with_max_tokens(config.llm.max_tokens)
            .with_system_prompt(config.llm.system_prompt.clone());

        Ok(Self::new(engine, session_id, label))
    }
}

#[async_trait]
impl ChatBackend for LocalBackend {
    async fn send(&mut self, message: &str) -> Result<Reply> {
        let session_id = match &self.session_id {
            Some(id) => id.clone(),
            None => {
                let id = self.store.create_session().await?;
                self.session_id = Some(id.clone());
                id
            }
        };

        let history = self.store.get_history(&session_id).await?;
        let outcome = self.engine.run(&history, message).await;
        if let Some(e) = &outcome.error {
            tracing::warn!(session = %session_id, error = %e, "Loop ended with an error");
        }
        let response = outcome.response_text();

        self.store.add_message(&session_id, Role::User, message).await?;
        self.store
            .add_message(&session_id, Role::Assistant, &response)
            .await?;

        Ok(Reply {
            response,
            session_id,
            tool_calls: outcome
                .tool_call_summaries()
                .into_iter()
                .map(|s| ToolCallLine {
                    name: s.name,
                    args: s.args,
                })
                .collect(),
        })
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

// ── Remote ────────────────────────────────────────────────────────

/// Forwards each message to a relay server's chat API.
pub struct RemoteBackend {
    client: ServerClient,
    session_id: Option<String>,
}

impl RemoteBackend {
    pub fn new(client: ServerClient, session_id: Option<String>) -> Self {
        Self { client, session_id }
    }
}

#[async_trait]
impl ChatBackend for RemoteBackend {
    async fn send(&mut self, message: &str) -> Result<Reply> {
        let reply = self
            .client
            .chat(message, self.session_id.as_deref())
            .await?;
        self.session_id = Some(reply.session_id.clone());
        Ok(Reply {
            response: reply.response,
            session_id: reply.session_id,
            tool_calls: reply
                .tool_calls
                .into_iter()
                .map(|c| ToolCallLine {
                    name: c.name,
                    args: c.args,
                })
                .collect(),
        })
    }

    fn describe(&self) -> String {
        format!("remote | {}", self.client.base_url())
    }
}
