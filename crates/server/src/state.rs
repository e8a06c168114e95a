//! Shared application state.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::info;

use relay_core::Config;
use relay_mcp::{register_remote_tools, McpConnection};
use relay_tool_runtime::{AgenticLoop, SessionStore, ToolInvoker, ToolRegistry};

pub struct AppState {
    pub config: Config,
    pub sessions: Arc<dyn SessionStore>,
    pub mcp: Arc<McpConnection>,
    /// Built on first use and kept; stays empty while the LLM or the tool
    /// server is unavailable.
    engine: RwLock<Option<Arc<AgenticLoop>>>,
}

impl AppState {
    pub fn new(config: Config, sessions: Arc<dyn SessionStore>, mcp: Arc<McpConnection>) -> Self {
        Self {
            config,
            sessions,
            mcp,
            engine: RwLock::new(None),
        }
    }

    #[cfg(test)]
    pub fn with_engine(self, engine: AgenticLoop) -> Self {
        Self {
            engine: RwLock::new(Some(Arc::new(engine))),
            ..self
        }
    }

    /// The engine if one has been built, without attempting to build it.
    pub async fn current_engine(&self) -> Option<Arc<AgenticLoop>> {
        self.engine.read().await.clone()
    }

    /// Return the chat engine, building it first if needed.
    pub async fn engine(&self) -> anyhow::Result<Arc<AgenticLoop>> {
        if let Some(engine) = self.current_engine().await {
            return Ok(engine);
        }

        let mut slot = self.engine.write().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(engine.clone());
        }
        let engine = Arc::new(self.build_engine().await?);
        *slot = Some(engine.clone());
        Ok(engine)
    }

    async fn build_engine(&self) -> anyhow::Result<AgenticLoop> {
        let provider = relay_llm::create_provider(&self.config.llm)
            .context("LLM provider unavailable")?;

        let mut registry = ToolRegistry::new();
        let count = register_remote_tools(&mut registry, self.mcp.clone())
            .await
            .with_context(|| format!("tool discovery at {} failed", self.config.mcp.server_url))?;
        info!(count, provider = provider.provider_name(), "Building chat engine");

        let invoker = Arc::new(ToolInvoker::new(Arc::new(registry)));
        let llm = &self.config.llm;
        Ok(AgenticLoop::new(provider, invoker)
            .with_max_iterations(self.config.chat.max_iterations)
            .with_max_context_tokens(self.config.chat.max_context_tokens)
            .with_temperature(llm.temperature)
            .with_max_tokens(llm.max_tokens)
            .with_system_prompt(llm.system_prompt.clone()))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use relay_mcp::ConnectionState;
    use relay_tool_runtime::provider::mock::MockLlmProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_engine_unavailable_without_api_key() {
        let state = state_without_engine();
        let err = state.engine().await.err().unwrap();
        assert!(format!("{:#}", err).contains("GOOGLE_API_KEY"));
        assert!(state.current_engine().await.is_none());
        // Provider check fails before the tool server is contacted.
        assert_eq!(state.mcp.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_injected_engine_is_reused() {
        let state = state_with_mock(Arc::new(MockLlmProvider::new()));
        let a = state.engine().await.unwrap();
        let b = state.engine().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.tools().len(), 1);
    }
}
