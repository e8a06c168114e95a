//! Registry handles for tools that live on a remote MCP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use relay_tool_runtime::{Tool, ToolError, ToolOutput, ToolRegistry};

use crate::connection::McpConnection;
use crate::error::McpError;

/// Forwards `execute` to the shared connection as a `tools/call`.
pub struct McpTool {
    name: String,
    connection: Arc<McpConnection>,
}

impl McpTool {
    pub fn new(name: impl Into<String>, connection: Arc<McpConnection>) -> Self {
        Self {
            name: name.into(),
            connection,
        }
    }
}

#[async_trait]
impl Tool for McpTool {
    async fn execute(&self, input: Value) -> Result<ToolOutput, ToolError> {
        let result = self
            .connection
            .call_tool(&self.name, input)
            .await
            .map_err(into_tool_error)?;

        Ok(ToolOutput {
            content: result.text(),
            is_error: result.is_error,
        })
    }
}

fn into_tool_error(e: McpError) -> ToolError {
    match e {
        McpError::Timeout { after, .. } => ToolError::Timeout(after),
        McpError::Rpc { message, .. } => ToolError::ExecutionFailed(message),
        McpError::MalformedResponse(m) => ToolError::MalformedResponse(m),
        McpError::JsonParse(e) => ToolError::MalformedResponse(e.to_string()),
        other => ToolError::Transport(other.to_string()),
    }
}

/// Discover the server's tools and register a handle for each one.
/// Returns how many were registered.
pub async fn register_remote_tools(
    registry: &mut ToolRegistry,
    connection: Arc<McpConnection>,
) -> Result<usize, McpError> {
    let definitions = connection.tool_definitions().await?;
    let count = definitions.len();
    for definition in definitions {
        let handle = Arc::new(McpTool::new(definition.name.clone(), connection.clone()));
        registry.register(definition, handle);
    }
    tracing::info!(count, "Registered remote tools");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::testing::ChannelConnector;
    use relay_tool_runtime::tool::{EchoTool, ToolCall};
    use relay_tool_runtime::ToolInvoker;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn test_remote_tools_flow_through_invoker() {
        let mut remote = ToolRegistry::new();
        remote.register(EchoTool::definition(), Arc::new(EchoTool));
        let connection = Arc::new(McpConnection::new(
            Box::new(ChannelConnector::new(Arc::new(remote))),
            "test",
            Duration::from_secs(2),
        ));

        let mut local = ToolRegistry::new();
        let count = register_remote_tools(&mut local, connection).await.unwrap();
        assert_eq!(count, 1);

        let invoker = ToolInvoker::new(Arc::new(local));
        let ok = invoker
            .invoke(&ToolCall {
                id: "1".into(),
                name: "echo".into(),
                input: json!({"message": "over the wire"}),
            })
            .await
            .unwrap();
        assert_eq!(ok.content, "over the wire");
        assert!(!ok.is_error);

        // The remote tool fails in-band; the flag survives the hop.
        let bad = invoker
            .invoke(&ToolCall {
                id: "2".into(),
                name: "echo".into(),
                input: json!({}),
            })
            .await
            .unwrap();
        assert!(bad.is_error);
        assert!(bad.content.starts_with("Error: "));
    }

    #[test]
    fn test_error_mapping() {
        assert!(matches!(
            into_tool_error(McpError::Timeout {
                method: "tools/call".into(),
                after: Duration::from_secs(30)
            }),
            ToolError::Timeout(_)
        ));
        assert!(matches!(
            into_tool_error(McpError::ConnectionClosed),
            ToolError::Transport(_)
        ));
        assert!(matches!(
            into_tool_error(McpError::Rpc {
                code: -32602,
                message: "Tool not found".into()
            }),
            ToolError::ExecutionFailed(_)
        ));
    }
}
