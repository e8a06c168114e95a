//! MCP server.
//!
//! Exposes a `ToolRegistry` over any [`McpTransport`]. Handy as an
//! in-process peer and for hosting local tools.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use relay_tool_runtime::ToolRegistry;

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

pub struct McpServer {
    registry: Arc<ToolRegistry>,
    server_name: String,
    server_version: String,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            server_name: "relay-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Serve requests until the transport closes.
    pub async fn run<T: McpTransport>(&self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "MCP server starting");

        while let Some(line) = transport.receive().await? {
            tracing::debug!(message = %line, "Received message");

            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse JSON");
                    let resp = JsonRpcResponse {
                        jsonrpc: "2.0".to_string(),
                        id: RpcId::Number(0),
                        result: None,
                        error: Some(McpError::JsonParse(e).to_rpc_error()),
                    };
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            // No "id" means notification.
            if raw.get("id").is_none() {
                if let Ok(notif) = serde_json::from_value::<JsonRpcNotification>(raw) {
                    self.handle_notification(&notif);
                }
                continue;
            }

            let response = match serde_json::from_value::<JsonRpcRequest>(raw) {
                Ok(request) => self.handle_request(&request).await,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse JSON-RPC request");
                    JsonRpcResponse::error(
                        RpcId::Number(0),
                        error_codes::INVALID_REQUEST,
                        e.to_string(),
                    )
                }
            };
            transport.send(&serde_json::to_string(&response)?).await?;
        }

        tracing::info!("Transport closed, shutting down");
        Ok(())
    }

    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        let outcome = match request.method.as_str() {
            "initialize" => to_result(self.initialize_result()),
            "tools/list" => to_result(ListToolsResult {
                tools: self.registry.list().into_iter().map(ToolInfo::from).collect(),
                next_cursor: None,
            }),
            "tools/call" => self.call_tool(&request.params).await,
            method => {
                tracing::warn!(method = %method, "Unknown method");
                Err(McpError::MethodNotFound(method.to_string()))
            }
        };

        match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                let err = e.to_rpc_error();
                JsonRpcResponse::error(id, err.code, err.message)
            }
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => tracing::info!("Client confirmed initialization"),
            method => tracing::debug!(method = %method, "Ignoring notification"),
        }
    }

    fn initialize_result(&self) -> InitializeResult {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        }
    }

    async fn call_tool(&self, params: &Option<Value>) -> Result<Value, McpError> {
        let params = params
            .clone()
            .ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let call: CallToolParams =
            serde_json::from_value(params).map_err(|e| McpError::InvalidParams(e.to_string()))?;

        tracing::debug!(tool = %call.name, "Handling tools/call");
        let tool = self
            .registry
            .resolve(&call.name)
            .map_err(|_| McpError::ToolNotFound(call.name.clone()))?;

        let result = match tool.execute(call.arguments).await {
            Ok(output) => CallToolResult {
                content: vec![ToolContent::Text {
                    text: output.content,
                }],
                is_error: output.is_error,
            },
            Err(e) => CallToolResult {
                content: vec![ToolContent::Text {
                    text: e.to_string(),
                }],
                is_error: true,
            },
        };
        to_result(result)
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Value, McpError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;
    use relay_tool_runtime::tool::EchoTool;
    use serde_json::json;

    fn server() -> McpServer {
        let mut reg = ToolRegistry::new();
        reg.register(EchoTool::definition(), Arc::new(EchoTool));
        McpServer::new(Arc::new(reg))
    }

    #[tokio::test]
    async fn test_handle_initialize() {
        let req = JsonRpcRequest::new(RpcId::Number(1), "initialize", Some(json!({})));
        let resp = server().handle_request(&req).await;
        let result: InitializeResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
        assert_eq!(result.server_info.name, "relay-mcp");
    }

    #[tokio::test]
    async fn test_handle_call_tool_reports_tool_failure_in_band() {
        let req = JsonRpcRequest::new(
            RpcId::Number(3),
            "tools/call",
            Some(json!({"name": "echo", "arguments": {}})),
        );
        let resp = server().handle_request(&req).await;
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
        assert!(result.text().contains("message"));
    }

    #[tokio::test]
    async fn test_handle_errors() {
        let s = server();
        let missing = JsonRpcRequest::new(
            RpcId::Number(4),
            "tools/call",
            Some(json!({"name": "nonexistent", "arguments": {}})),
        );
        let err = s.handle_request(&missing).await.error.unwrap();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);

        let unknown = JsonRpcRequest::new(RpcId::Number(5), "unknown/method", None);
        let err = s.handle_request(&unknown).await.error.unwrap();
        assert_eq!(err.code, error_codes::METHOD_NOT_FOUND);

        let no_params = JsonRpcRequest::new(RpcId::Number(6), "tools/call", None);
        let err = s.handle_request(&no_params).await.error.unwrap();
        assert_eq!(err.code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_run_answers_garbage_with_parse_error() {
        let (mut client_side, mut server_side) = ChannelTransport::pair();
        let server_handle = tokio::spawn(async move { server().run(&mut server_side).await });

        client_side.send("{oops").await.unwrap();
        let resp: JsonRpcResponse =
            serde_json::from_str(&client_side.receive().await.unwrap().unwrap()).unwrap();
        assert_eq!(resp.error.unwrap().code, error_codes::PARSE_ERROR);

        drop(client_side);
        server_handle.await.unwrap().unwrap();
    }
}
