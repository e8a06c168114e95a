//! Connection lifecycle for a remote tool server.
//!
//! ```text
//! Disconnected ──ensure_ready──▶ Connecting ──ok──▶ Ready
//!      ▲                             │                │
//!      └──────────── err ────────────┘     transport failure
//!                                                     ▼
//!                        Connecting ◀──ensure_ready── Degraded
//! ```
//!
//! `disconnect()` returns to `Disconnected` from any state.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use relay_tool_runtime::ToolDefinition;

use crate::client::McpClient;
use crate::error::McpError;
use crate::transport::{McpTransport, SseTransport};
use crate::types::CallToolResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
    Degraded,
}

/// Opens fresh transports to the tool server.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn open(&self) -> Result<Box<dyn McpTransport>, McpError>;

    /// Where this connector points, for logs.
    fn target(&self) -> String;
}

pub struct SseConnector {
    url: String,
    handshake_timeout: Duration,
}

impl SseConnector {
    pub fn new(url: impl Into<String>, handshake_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            handshake_timeout,
        }
    }
}

#[async_trait]
impl Connector for SseConnector {
    async fn open(&self) -> Result<Box<dyn McpTransport>, McpError> {
        let transport = SseTransport::connect(&self.url, self.handshake_timeout).await?;
        Ok(Box::new(transport))
    }

    fn target(&self) -> String {
        self.url.clone()
    }
}

/// Shared handle to one tool server. Clients are built lazily and rebuilt
/// after a transport failure; callers never hold a stale client.
pub struct McpConnection {
    connector: Box<dyn Connector>,
    client_name: String,
    request_timeout: Duration,
    state: StdMutex<ConnectionState>,
    client: Mutex<Option<Arc<McpClient>>>,
}

impl McpConnection {
    pub fn new(
        connector: Box<dyn Connector>,
        client_name: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            client_name: client_name.into(),
            request_timeout,
            state: StdMutex::new(ConnectionState::Disconnected),
            client: Mutex::new(None),
        }
    }

    /// Connection to an MCP server's SSE endpoint.
    pub fn sse(url: &str, client_name: &str, request_timeout: Duration) -> Self {
        Self::new(
            Box::new(SseConnector::new(url, request_timeout)),
            client_name,
            request_timeout,
        )
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn transition(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != next {
            tracing::info!(
                target_url = %self.connector.target(),
                from = ?*state,
                to = ?next,
                "MCP connection state change"
            );
            *state = next;
        }
    }

    /// Return a ready client, connecting first if needed.
    pub async fn ensure_ready(&self) -> Result<Arc<McpClient>, McpError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        self.transition(ConnectionState::Connecting);
        let connected = async {
            let transport = self.connector.open().await?;
            McpClient::connect(transport, &self.client_name, self.request_timeout).await
        }
        .await;

        match connected {
            Ok(client) => {
                let client = Arc::new(client);
                *slot = Some(client.clone());
                self.transition(ConnectionState::Ready);
                Ok(client)
            }
            Err(e) => {
                tracing::warn!(error = %e, target_url = %self.connector.target(), "MCP connect failed");
                self.transition(ConnectionState::Disconnected);
                Err(e)
            }
        }
    }

    pub async fn tool_definitions(&self) -> Result<Vec<ToolDefinition>, McpError> {
        Ok(self.ensure_ready().await?.tool_definitions())
    }

    /// Call a tool, reconnecting first if the previous call broke the link.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let client = self.ensure_ready().await?;
        let result = client.call_tool(name, arguments).await;
        if let Err(e) = &result {
            if e.is_connection_failure() {
                self.mark_degraded(&client, e).await;
            }
        }
        result
    }

    async fn mark_degraded(&self, failed: &Arc<McpClient>, error: &McpError) {
        let mut slot = self.client.lock().await;
        // Another caller may already have replaced the client.
        if slot.as_ref().is_some_and(|c| Arc::ptr_eq(c, failed)) {
            tracing::warn!(error = %error, "MCP transport failure; connection degraded");
            *slot = None;
            self.transition(ConnectionState::Degraded);
        }
    }

    pub async fn disconnect(&self) {
        self.client.lock().await.take();
        self.transition(ConnectionState::Disconnected);
    }
}
