//! MCP (Model Context Protocol) client side for relay.
//!
//! JSON-RPC 2.0 over HTTP + Server-Sent Events, used to discover and call
//! tools hosted on a remote server.
//!
//! - **types**: JSON-RPC 2.0 and MCP wire types
//! - **transport**: SSE and in-memory transports
//! - **client**: handshake, discovery, `tools/call`
//! - **connection**: lifecycle state machine with lazy reconnect
//! - **tool**: registry handles for remote tools
//! - **server**: serves a `ToolRegistry` over a transport
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use relay_mcp::{register_remote_tools, McpConnection};
//! use relay_tool_runtime::ToolRegistry;
//!
//! # async fn example() -> Result<(), relay_mcp::McpError> {
//! let connection = Arc::new(McpConnection::sse(
//!     "http://localhost:8001/sse",
//!     "relay",
//!     Duration::from_secs(30),
//! ));
//! let mut registry = ToolRegistry::new();
//! register_remote_tools(&mut registry, connection).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod server;
pub mod tool;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use connection::{ConnectionState, Connector, McpConnection, SseConnector};
pub use error::McpError;
pub use server::McpServer;
pub use tool::{register_remote_tools, McpTool};
pub use transport::{ChannelTransport, McpTransport, SseTransport};
pub use types::*;
