//! MCP client.
//!
//! Performs the initialize handshake over any [`McpTransport`], discovers
//! the server's tools, and issues `tools/call` requests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use relay_tool_runtime::ToolDefinition;

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// A connected, initialized MCP session.
///
/// Each request holds the transport lock from send until its matching
/// response is read, so concurrent callers never interleave frames.
pub struct McpClient {
    transport: Mutex<Box<dyn McpTransport>>,
    next_id: AtomicI64,
    request_timeout: Duration,
    server_info: Option<ServerInfo>,
    tools: Vec<ToolInfo>,
}

impl McpClient {
    /// Handshake and tool discovery over an already open transport.
    pub async fn connect(
        transport: Box<dyn McpTransport>,
        client_name: &str,
        request_timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut client = Self {
            transport: Mutex::new(transport),
            next_id: AtomicI64::new(1),
            request_timeout,
            server_info: None,
            tools: Vec::new(),
        };

        client.initialize(client_name).await?;
        client.discover_tools().await?;

        Ok(client)
    }

    /// Send a request and wait for the response carrying the same id.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = RpcId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let json = serde_json::to_string(&JsonRpcRequest::new(id.clone(), method, params))?;

        let mut transport = self.transport.lock().await;
        tracing::debug!(method = %method, id = %id, "Sending request");
        transport.send(&json).await?;

        let response = tokio::time::timeout(self.request_timeout, async {
            loop {
                let line = transport
                    .receive()
                    .await?
                    .ok_or(McpError::ConnectionClosed)?;
                let raw: Value = match serde_json::from_str(&line) {
                    Ok(v) => v,
                    Err(e) => {
                        tracing::warn!(error = %e, "Discarding unparseable message");
                        continue;
                    }
                };
                if raw.get("id").is_none() {
                    tracing::trace!(method = ?raw.get("method"), "Ignoring server notification");
                    continue;
                }
                let response: JsonRpcResponse = serde_json::from_value(raw)?;
                if response.id == id {
                    return Ok::<_, McpError>(response);
                }
                tracing::warn!(expected = %id, got = %response.id, "Discarding response for another request");
            }
        })
        .await
        .map_err(|_| McpError::Timeout {
            method: method.to_string(),
            after: self.request_timeout,
        })??;

        if let Some(err) = response.error {
            return Err(err.into());
        }
        response
            .result
            .ok_or_else(|| McpError::MalformedResponse(format!("{} response has no result", method)))
    }

    /// Send a JSON-RPC notification (no response expected).
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        let json = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.transport.lock().await.send(&json).await
    }

    async fn initialize(&mut self, client_name: &str) -> Result<(), McpError> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: client_name.to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
        };

        let result = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await
            .map_err(|e| match e {
                McpError::Rpc { message, .. } => McpError::ServerUnavailable(message),
                other => other,
            })?;
        let result: InitializeResult = serde_json::from_value(result)?;
        if result.protocol_version != PROTOCOL_VERSION {
            tracing::warn!(
                server = %result.protocol_version,
                client = PROTOCOL_VERSION,
                "Server negotiated a different protocol version"
            );
        }

        self.notify("notifications/initialized", None).await?;

        tracing::info!(server = %result.server_info.name, "MCP client initialized");
        self.server_info = Some(result.server_info);
        Ok(())
    }

    async fn discover_tools(&mut self) -> Result<(), McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result: ListToolsResult =
                serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(result.tools);
            match result.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        for tool in &tools {
            tracing::debug!(name = %tool.name, "Discovered tool");
        }
        tracing::info!(count = tools.len(), "Tool discovery complete");
        self.tools = tools;
        Ok(())
    }

    /// Call a tool on the remote server. A result with `is_error` set is
    /// still `Ok`; only protocol and transport failures are `Err`.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self
            .request("tools/call", Some(serde_json::to_value(params)?))
            .await?;
        serde_json::from_value(result).map_err(|e| McpError::MalformedResponse(e.to_string()))
    }

    /// Discovered tools, in the order the server listed them.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().cloned().map(ToolDefinition::from).collect()
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server_info.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::McpServer;
    use crate::transport::ChannelTransport;
    use relay_tool_runtime::tool::EchoTool;
    use relay_tool_runtime::ToolRegistry;
    use serde_json::json;
    use std::sync::Arc;

    async fn connected_client() -> McpClient {
        let (client_side, mut server_side) = ChannelTransport::pair();
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool::definition(), Arc::new(EchoTool));
        let server = McpServer::new(Arc::new(registry));
        tokio::spawn(async move { server.run(&mut server_side).await });

        McpClient::connect(Box::new(client_side), "test-client", Duration::from_secs(5))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_connect_discovers_tools() {
        let client = connected_client().await;
        let defs = client.tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert_eq!(client.server_info().unwrap().name, "relay-mcp");
    }

    #[tokio::test]
    async fn test_call_tool_roundtrip() {
        let client = connected_client().await;
        let result = client
            .call_tool("echo", json!({"message": "hello mcp"}))
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.text(), "hello mcp");
    }

    #[tokio::test]
    async fn test_remote_rpc_error_is_surfaced() {
        let client = connected_client().await;
        let err = client.call_tool("nonexistent", json!({})).await.unwrap_err();
        match err {
            McpError::Rpc { code, message } => {
                assert_eq!(code, error_codes::INVALID_PARAMS);
                assert!(message.contains("nonexistent"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    /// A scripted peer that answers out of order and with noise.
    #[tokio::test]
    async fn test_mismatched_ids_and_notifications_are_skipped() {
        let (client_side, mut peer) = ChannelTransport::pair();
        tokio::spawn(async move {
            while let Ok(Some(line)) = peer.receive().await {
                let raw: Value = serde_json::from_str(&line).unwrap();
                let Some(id) = raw.get("id").cloned() else { continue };
                let id: RpcId = serde_json::from_value(id).unwrap();
                let result = match raw["method"].as_str().unwrap() {
                    "initialize" => json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "serverInfo": {"name": "noisy"}
                    }),
                    "tools/list" => json!({"tools": [{"name": "get_weather"}]}),
                    _ => json!({"content": [{"type": "text", "text": "sunny"}]}),
                };
                let stale = JsonRpcResponse::success(RpcId::Number(9999), json!({}));
                let note = JsonRpcNotification::new("notifications/message", None);
                peer.send(&serde_json::to_string(&stale).unwrap()).await.unwrap();
                peer.send("not json").await.unwrap();
                peer.send(&serde_json::to_string(&note).unwrap()).await.unwrap();
                let resp = JsonRpcResponse::success(id, result);
                peer.send(&serde_json::to_string(&resp).unwrap()).await.unwrap();
            }
        });

        let client = McpClient::connect(Box::new(client_side), "t", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(client.tool_definitions()[0].name, "get_weather");
        let result = client.call_tool("get_weather", json!({"city": "Tokyo"})).await.unwrap();
        assert_eq!(result.text(), "sunny");
    }

    #[tokio::test]
    async fn test_concurrent_calls_each_get_their_own_result() {
        let (client_side, mut peer) = ChannelTransport::pair();
        tokio::spawn(async move {
            while let Ok(Some(line)) = peer.receive().await {
                let raw: Value = serde_json::from_str(&line).unwrap();
                let Some(id) = raw.get("id").cloned() else { continue };
                let id: RpcId = serde_json::from_value(id).unwrap();
                let result = match raw["method"].as_str().unwrap() {
                    "initialize" => json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {},
                        "serverInfo": {"name": "slow"}
                    }),
                    "tools/list" => json!({"tools": [{"name": "get_weather"}]}),
                    _ => {
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        let city = raw["params"]["arguments"]["city"].as_str().unwrap();
                        json!({"content": [{"type": "text", "text": format!("sunny in {}", city)}]})
                    }
                };
                let resp = JsonRpcResponse::success(id, result);
                peer.send(&serde_json::to_string(&resp).unwrap()).await.unwrap();
            }
        });

        let client = Arc::new(
            McpClient::connect(Box::new(client_side), "t", Duration::from_secs(5))
                .await
                .unwrap(),
        );
        let cities = ["Tokyo", "Osaka", "Kyoto", "Sapporo"];
        let handles: Vec<_> = cities
            .iter()
            .map(|city| {
                let client = client.clone();
                let city = city.to_string();
                tokio::spawn(async move {
                    let result = client
                        .call_tool("get_weather", json!({"city": city}))
                        .await
                        .unwrap();
                    (city, result.text())
                })
            })
            .collect();

        for handle in handles {
            let (city, text) = handle.await.unwrap();
            assert_eq!(text, format!("sunny in {}", city));
        }
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let (client_side, _silent_peer) = ChannelTransport::pair();
        let err = McpClient::connect(Box::new(client_side), "t", Duration::from_millis(50))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Timeout { ref method, .. } if method == "initialize"));
    }

    #[tokio::test]
    async fn test_closed_peer_is_connection_closed() {
        let (client_side, peer) = ChannelTransport::pair();
        drop(peer);
        let err = McpClient::connect(Box::new(client_side), "t", Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(err.is_connection_failure());
    }
}
