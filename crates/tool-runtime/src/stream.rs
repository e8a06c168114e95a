use serde::{Deserialize, Serialize};

/// Events emitted during a model turn.
///
/// Provider-agnostic; each provider translates its wire format into these.
/// Gemini answers in one piece, so its response is replayed as a burst:
/// one `TextDelta` per text part, and per `functionCall` part a
/// `ToolCallStart`, a single `ToolCallDelta` carrying the whole argument
/// object, then `ToolCallEnd`. The loop folds either shape the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A chunk of text from the assistant
    TextDelta {
        text: String,
    },
    /// Start of a tool call (LLM wants to execute a tool)
    ToolCallStart {
        id: String,
        name: String,
    },
    /// Incremental JSON argument data for a tool call
    ToolCallDelta {
        id: String,
        arguments_delta: String,
    },
    /// Tool call arguments are complete
    ToolCallEnd {
        id: String,
    },
    /// The entire message is complete
    MessageEnd {
        stop_reason: StopReason,
    },
    /// The turn failed mid-way, or the provider blocked it outright
    /// without producing any content. The loop treats this as fatal.
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Normal end of response
    EndTurn,
    /// Model wants to use tools
    ToolUse,
    /// Hit max tokens limit
    MaxTokens,
    /// Stopped by a provider-side filter (Gemini `SAFETY`, `RECITATION`,
    /// `BLOCKLIST`, `PROHIBITED_CONTENT`, `SPII`). Partial content, if any,
    /// is still delivered.
    Blocked,
}
