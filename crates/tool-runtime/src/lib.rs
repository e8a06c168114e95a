pub mod conversation;
pub mod invoker;
pub mod provider;
pub mod registry;
pub mod runtime;
pub mod session;
pub mod stream;
pub mod tool;

pub use conversation::{Conversation, ConversationTurn, Role};
pub use invoker::ToolInvoker;
pub use provider::{LlmError, ToolAwareLlmProvider};
pub use registry::{RegistryError, ToolRegistry};
pub use runtime::{AgenticLoop, LoopError, LoopOutcome, ToolCallSummary};
pub use session::{InMemorySessionStore, Session, SessionStore, SessionSummary};
pub use stream::StreamEvent;
pub use tool::{Tool, ToolCall, ToolDefinition, ToolError, ToolOutput, ToolResult};
