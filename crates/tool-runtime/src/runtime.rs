use crate::conversation::{AssistantContent, Conversation, ConversationTurn};
use crate::invoker::ToolInvoker;
use crate::provider::{LlmError, ToolAwareLlmProvider};
use crate::registry::RegistryError;
use crate::stream::{StopReason, StreamEvent};
use crate::tool::{ToolCall, ToolDefinition, ToolResult};
use futures::StreamExt;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Errors that end a loop run. Per-call failures never show up here; they
/// are fed back to the model as error-flagged tool results.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoopError {
    #[error("Iteration limit exceeded: the model kept requesting tools after {0} calls")]
    IterationLimitExceeded(usize),
    #[error("Transport fault: {0}")]
    TransportFault(String),
}

impl From<LlmError> for LoopError {
    fn from(e: LlmError) -> Self {
        LoopError::TransportFault(e.to_string())
    }
}

/// What one run of the loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// The model's final answer; empty when the run ended in an error.
    pub final_text: String,
    /// Calls actually dispatched, in order, each with its result.
    pub executed_calls: Vec<(ToolCall, ToolResult)>,
    pub error: Option<LoopError>,
}

impl LoopOutcome {
    fn completed(final_text: String, executed_calls: Vec<(ToolCall, ToolResult)>) -> Self {
        Self {
            final_text,
            executed_calls,
            error: None,
        }
    }

    fn failed(executed_calls: Vec<(ToolCall, ToolResult)>, error: LoopError) -> Self {
        Self {
            final_text: String::new(),
            executed_calls,
            error: Some(error),
        }
    }

    /// Text to show the user and persist as the assistant turn.
    pub fn response_text(&self) -> String {
        match &self.error {
            Some(e) => format!("Error: {}", e),
            None => self.final_text.clone(),
        }
    }

    pub fn tool_call_summaries(&self) -> Vec<ToolCallSummary> {
        self.executed_calls
            .iter()
            .map(|(call, result)| ToolCallSummary {
                name: call.name.clone(),
                args: call.input.clone(),
                is_error: result.is_error,
            })
            .collect()
    }
}

/// Compact view of one executed call, as reported to API clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallSummary {
    pub name: String,
    pub args: serde_json::Value,
    pub is_error: bool,
}

/// A single model turn, folded from its stream events.
struct ModelTurn {
    text: Option<String>,
    tool_calls: Vec<ToolCall>,
}

/// The loop that orchestrates model turns and tool execution.
///
/// Flow: User → LLM → ToolCall → Invoke → Result → LLM → ... → Final Text
///
/// Calls are resolved one at a time. When a turn carries several tool calls
/// only the first is dispatched; the rest are logged and dropped so the
/// model never sees results for calls it did not get to observe in order.
pub struct AgenticLoop {
    provider: Arc<dyn ToolAwareLlmProvider>,
    invoker: Arc<ToolInvoker>,
    max_iterations: usize,
    temperature: f32,
    max_tokens: u32,
    max_context_tokens: usize,
    system_prompt: Option<String>,
}

impl AgenticLoop {
    pub fn new(provider: Arc<dyn ToolAwareLlmProvider>, invoker: Arc<ToolInvoker>) -> Self {
        Self {
            provider,
            invoker,
            max_iterations: 8,
            temperature: 0.1,
            max_tokens: 4096,
            max_context_tokens: 100_000,
            system_prompt: None,
        }
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn with_max_context_tokens(mut self, max: usize) -> Self {
        self.max_context_tokens = max;
        self
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn tools(&self) -> Vec<ToolDefinition> {
        self.invoker.registry().list()
    }

    /// Run one user message through the loop. Always returns an outcome;
    /// fatal conditions are reported in `LoopOutcome::error`.
    pub async fn run(&self, history: &[ConversationTurn], user_message: &str) -> LoopOutcome {
        let mut conversation = Conversation::from_history(history, self.max_context_tokens)
            .with_system_prompt(self.system_prompt.clone());
        conversation.add_user_message(user_message.to_string());

        let tools = self.tools();
        let mut executed: Vec<(ToolCall, ToolResult)> = Vec::new();

        let mut iteration = 0usize;
        loop {
            debug!(iteration, provider = self.provider_name(), "Requesting model turn");

            let turn = match self.next_turn(&conversation, tools.clone()).await {
                Ok(turn) => turn,
                Err(e) => {
                    warn!(iteration, error = %e, "Model request failed");
                    return LoopOutcome::failed(executed, e);
                }
            };

            let mut calls = turn.tool_calls.into_iter();
            let Some(call) = calls.next() else {
                let text = turn.text.unwrap_or_default();
                info!(iteration, calls = executed.len(), "Loop complete");
                return LoopOutcome::completed(text, executed);
            };
            for dropped in calls {
                warn!(tool = %dropped.name, id = %dropped.id, "Dropping extra tool call in turn");
            }

            if executed.len() >= self.max_iterations {
                warn!(
                    tool = %call.name,
                    max_iterations = self.max_iterations,
                    "Tool call limit reached; not dispatching"
                );
                return LoopOutcome::failed(
                    executed,
                    LoopError::IterationLimitExceeded(self.max_iterations),
                );
            }

            conversation.add_assistant_response(AssistantContent {
                text: turn.text,
                tool_calls: vec![call.clone()],
            });

            let result = match self.dispatch(&call).await {
                Ok(result) => result,
                Err(e) => return LoopOutcome::failed(executed, e),
            };
            info!(
                iteration,
                tool = %call.name,
                is_error = result.is_error,
                "Tool call resolved"
            );

            conversation.add_tool_result(result.clone());
            executed.push((call, result));
            iteration += 1;
        }
    }

    /// Request one model turn and fold its events.
    async fn next_turn(
        &self,
        conversation: &Conversation,
        tools: Vec<ToolDefinition>,
    ) -> Result<ModelTurn, LoopError> {
        let mut stream = self
            .provider
            .stream_with_tools(
                conversation.messages().to_vec(),
                conversation.system_prompt().map(String::from),
                tools,
                self.temperature,
                self.max_tokens,
            )
            .await?;

        let mut text_parts = Vec::new();
        let mut tool_calls: Vec<ToolCall> = Vec::new();
        let mut current_tool_args = String::new();
        let mut current_tool_id = String::new();
        let mut current_tool_name = String::new();

        while let Some(event_result) = stream.next().await {
            match event_result? {
                StreamEvent::TextDelta { text } => text_parts.push(text),
                StreamEvent::ToolCallStart { id, name } => {
                    current_tool_id = id;
                    current_tool_name = name;
                    current_tool_args.clear();
                }
                StreamEvent::ToolCallDelta {
                    arguments_delta, ..
                } => current_tool_args.push_str(&arguments_delta),
                StreamEvent::ToolCallEnd { .. } => {
                    tool_calls.push(ToolCall {
                        id: std::mem::take(&mut current_tool_id),
                        name: std::mem::take(&mut current_tool_name),
                        input: parse_arguments(&current_tool_args),
                    });
                }
                StreamEvent::MessageEnd { stop_reason } => {
                    if stop_reason == StopReason::MaxTokens {
                        warn!("Model turn truncated at max tokens");
                    }
                }
                StreamEvent::Error { message } => {
                    return Err(LoopError::TransportFault(message));
                }
            }
        }

        let text = if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join(""))
        };
        Ok(ModelTurn { text, tool_calls })
    }

    /// Run the invocation in its own task so it finishes even if the caller
    /// is dropped mid-flight.
    async fn dispatch(&self, call: &ToolCall) -> Result<ToolResult, LoopError> {
        let invoker = self.invoker.clone();
        let task_call = call.clone();
        let handle = tokio::spawn(async move { invoker.invoke(&task_call).await });

        match handle.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(RegistryError::UnknownTool(name))) => {
                warn!(tool = %name, "Model requested unknown tool");
                Ok(ToolResult::error(
                    call,
                    format!("Error: unknown tool '{}'", name),
                ))
            }
            Err(e) => Err(LoopError::TransportFault(format!(
                "invocation of '{}' did not complete: {}",
                call.name, e
            ))),
        }
    }
}

fn parse_arguments(raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(error = %e, "Tool call arguments are not valid JSON; sending empty object");
        serde_json::json!({})
    })
}
