use crate::conversation::ConversationMessage;
use crate::stream::StreamEvent;
use crate::tool::ToolDefinition;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Trait for LLM providers that support tool use.
///
/// Defined here rather than in the provider crate because the loop is the
/// consumer. Implementations live in `relay-llm`.
#[async_trait]
pub trait ToolAwareLlmProvider: Send + Sync {
    /// Produce the next model turn with tool definitions available.
    async fn stream_with_tools(
        &self,
        messages: Vec<ConversationMessage>,
        system_prompt: Option<String>,
        tools: Vec<ToolDefinition>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<EventStream, LlmError>;

    /// Provider name for logging ("gemini", "mock").
    fn provider_name(&self) -> &str;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
    #[error("Authentication failed")]
    AuthError,
    #[error("Not configured: {0}")]
    NotConfigured(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Scripted provider for exercising the loop without real API calls.
#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use super::*;
    use crate::stream::StopReason;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Scripted {
        Events(Vec<StreamEvent>),
        Fail(String),
    }

    /// Replays queued turns in FIFO order and records every request it sees.
    #[derive(Default)]
    pub struct MockLlmProvider {
        responses: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<Vec<ConversationMessage>>>,
        advertised: Mutex<Vec<Vec<ToolDefinition>>>,
        latency: Duration,
    }

    impl MockLlmProvider {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every request waits this long before answering.
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = latency;
            self
        }

        pub fn queue_response(&self, events: Vec<StreamEvent>) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Scripted::Events(events));
        }

        pub fn queue_text(&self, text: &str) {
            self.queue_response(vec![
                StreamEvent::TextDelta {
                    text: text.to_string(),
                },
                StreamEvent::MessageEnd {
                    stop_reason: StopReason::EndTurn,
                },
            ]);
        }

        pub fn queue_tool_call(&self, id: &str, name: &str, arguments: serde_json::Value) {
            self.queue_response(tool_call_events(&[(id, name, arguments)]));
        }

        /// A single turn carrying several tool calls.
        pub fn queue_tool_calls(&self, calls: &[(&str, &str, serde_json::Value)]) {
            self.queue_response(tool_call_events(calls));
        }

        /// The next request fails before producing a stream.
        pub fn queue_failure(&self, message: &str) {
            self.responses
                .lock()
                .unwrap()
                .push_back(Scripted::Fail(message.to_string()));
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<Vec<ConversationMessage>> {
            self.requests.lock().unwrap().clone()
        }

        pub fn advertised_tools(&self) -> Vec<Vec<ToolDefinition>> {
            self.advertised.lock().unwrap().clone()
        }
    }

    fn tool_call_events(calls: &[(&str, &str, serde_json::Value)]) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        for (id, name, arguments) in calls {
            events.push(StreamEvent::ToolCallStart {
                id: id.to_string(),
                name: name.to_string(),
            });
            events.push(StreamEvent::ToolCallDelta {
                id: id.to_string(),
                arguments_delta: arguments.to_string(),
            });
            events.push(StreamEvent::ToolCallEnd { id: id.to_string() });
        }
        events.push(StreamEvent::MessageEnd {
            stop_reason: StopReason::ToolUse,
        });
        events
    }

    #[async_trait]
    impl ToolAwareLlmProvider for MockLlmProvider {
        async fn stream_with_tools(
            &self,
            messages: Vec<ConversationMessage>,
            _system_prompt: Option<String>,
            tools: Vec<ToolDefinition>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<EventStream, LlmError> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.requests.lock().unwrap().push(messages);
            self.advertised.lock().unwrap().push(tools);
            let next = self.responses.lock().unwrap().pop_front();
            let events = match next {
                Some(Scripted::Events(events)) => events,
                Some(Scripted::Fail(message)) => return Err(LlmError::NetworkError(message)),
                None => vec![StreamEvent::MessageEnd {
                    stop_reason: StopReason::EndTurn,
                }],
            };
            Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
        }

        fn provider_name(&self) -> &str {
            "mock"
        }
    }
}
