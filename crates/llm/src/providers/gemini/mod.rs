//! Gemini (Google Generative Language API) implementation of
//! [`ToolAwareLlmProvider`](relay_tool_runtime::ToolAwareLlmProvider).

mod provider;
mod response;
mod translate;

pub use self::provider::GeminiToolProvider;

#[cfg(test)]
mod tests;
