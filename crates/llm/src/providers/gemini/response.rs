//! Parsing of `generateContent` responses into [`StreamEvent`]s.

use serde_json::Value;

use relay_tool_runtime::provider::LlmError;
use relay_tool_runtime::stream::{StopReason, StreamEvent};

/// Turn one non-streamed response into the events the loop folds.
pub(super) fn parse_response(resp: &Value) -> Result<Vec<StreamEvent>, LlmError> {
    let Some(candidate) = resp["candidates"].get(0) else {
        if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
            return Ok(vec![StreamEvent::Error {
                message: format!("prompt blocked: {}", reason),
            }]);
        }
        return Err(LlmError::InvalidResponse(
            "response has no candidates".to_string(),
        ));
    };

    let mut events = Vec::new();
    let mut saw_call = false;
    let parts = candidate["content"]["parts"]
        .as_array()
        .map(Vec::as_slice)
        .unwrap_or_default();

    for (index, part) in parts.iter().enumerate() {
        if let Some(text) = part["text"].as_str() {
            if !text.is_empty() {
                events.push(StreamEvent::TextDelta {
                    text: text.to_string(),
                });
            }
        } else if let Some(call) = part.get("functionCall") {
            let name = call["name"].as_str().ok_or_else(|| {
                LlmError::InvalidResponse("functionCall without a name".to_string())
            })?;
            let id = call["id"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| format!("{}-{}", name, index));
            let args = match call.get("args") {
                Some(Value::Null) | None => "{}".to_string(),
                Some(args) => args.to_string(),
            };
            events.push(StreamEvent::ToolCallStart {
                id: id.clone(),
                name: name.to_string(),
            });
            events.push(StreamEvent::ToolCallDelta {
                id: id.clone(),
                arguments_delta: args,
            });
            events.push(StreamEvent::ToolCallEnd { id });
            saw_call = true;
        }
    }

    let stop_reason = match candidate["finishReason"].as_str() {
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST")
        | Some("PROHIBITED_CONTENT") | Some("SPII") => StopReason::Blocked,
        _ if saw_call => StopReason::ToolUse,
        _ => StopReason::EndTurn,
    };

    if stop_reason == StopReason::Blocked && events.is_empty() {
        let reason = candidate["finishReason"].as_str().unwrap_or("unknown");
        events.push(StreamEvent::Error {
            message: format!("response blocked: {}", reason),
        });
    }

    events.push(StreamEvent::MessageEnd { stop_reason });
    Ok(events)
}

/// Map a non-success HTTP status to an [`LlmError`].
pub(super) fn status_error(status: u16, body: &str) -> LlmError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string());
    match status {
        401 | 403 => LlmError::AuthError,
        429 => LlmError::RateLimited {
            retry_after_secs: 30,
        },
        _ => LlmError::ApiError { status, message },
    }
}
