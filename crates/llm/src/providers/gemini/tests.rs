//! Unit tests for the Gemini tool provider.

use serde_json::json;

use relay_tool_runtime::conversation::{AssistantContent, ConversationMessage};
use relay_tool_runtime::provider::{LlmError, ToolAwareLlmProvider};
use relay_tool_runtime::stream::{StopReason, StreamEvent};
use relay_tool_runtime::tool::{ToolCall, ToolDefinition, ToolResult};

use super::provider::GeminiToolProvider;
use super::response::{parse_response, status_error};
use super::translate::{build_request_body, message_to_gemini, sanitize_schema, tool_definition_to_gemini};

fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".to_string(),
        description: "Get current weather for a city".to_string(),
        input_schema: json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "get_weatherArguments",
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "city": { "type": "string", "title": "City" },
                "title": { "type": "string", "default": "Mr" }
            },
            "required": ["city"]
        }),
    }
}

#[test]
fn test_sanitize_strips_rejected_keys_but_keeps_property_names() {
    let cleaned = sanitize_schema(&weather_tool().input_schema);

    assert!(cleaned.get("$schema").is_none());
    assert!(cleaned.get("title").is_none());
    assert!(cleaned.get("additionalProperties").is_none());
    assert_eq!(cleaned["required"], json!(["city"]));

    let props = cleaned["properties"].as_object().unwrap();
    assert!(props.contains_key("city"));
    assert!(props.contains_key("title"));
    assert!(props["city"].get("title").is_none());
    assert!(props["title"].get("default").is_none());
}

#[test]
fn test_tool_declaration_omits_empty_parameters() {
    let decl = tool_definition_to_gemini(&weather_tool());
    assert_eq!(decl["name"], "get_weather");
    assert_eq!(decl["parameters"]["properties"]["city"]["type"], "string");

    let bare = ToolDefinition {
        name: "list_sessions".into(),
        description: "No arguments".into(),
        input_schema: json!({"type": "object", "properties": {}}),
    };
    assert!(tool_definition_to_gemini(&bare).get("parameters").is_none());
}

#[test]
fn test_assistant_turn_maps_to_model_role() {
    let msg = ConversationMessage::Assistant(AssistantContent {
        text: Some("Let me check.".into()),
        tool_calls: vec![ToolCall {
            id: "get_weather-0".into(),
            name: "get_weather".into(),
            input: json!({"city": "Tokyo"}),
        }],
    });
    let v = message_to_gemini(&msg);
    assert_eq!(v["role"], "model");
    assert_eq!(v["parts"][0]["text"], "Let me check.");
    assert_eq!(v["parts"][1]["functionCall"]["name"], "get_weather");
    assert_eq!(v["parts"][1]["functionCall"]["args"]["city"], "Tokyo");
}

#[test]
fn test_tool_result_maps_to_function_response() {
    let call = ToolCall {
        id: "x".into(),
        name: "get_weather".into(),
        input: json!({"city": "Tokyo"}),
    };
    let msg = ConversationMessage::ToolResult(ToolResult::success(&call, "clear sky"));
    let v = message_to_gemini(&msg);
    assert_eq!(v["role"], "user");
    assert_eq!(v["parts"][0]["functionResponse"]["name"], "get_weather");
    assert_eq!(
        v["parts"][0]["functionResponse"]["response"]["result"],
        "clear sky"
    );
}

#[test]
fn test_request_body_structure() {
    let messages = vec![ConversationMessage::User("Weather in Tokyo?".into())];
    let body = build_request_body(&messages, Some("Be brief."), &[weather_tool()], 0.1, 4096);

    assert_eq!(body["system_instruction"]["parts"][0]["text"], "Be brief.");
    assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["tools"][0]["functionDeclarations"][0]["name"],
        "get_weather"
    );
    let temp = body["generationConfig"]["temperature"].as_f64().unwrap();
    assert!((temp - 0.1).abs() < 1e-6);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 4096);

    let no_tools = build_request_body(&messages, None, &[], 0.5, 10);
    assert!(no_tools.get("tools").is_none());
    assert!(no_tools.get("system_instruction").is_none());
}

#[test]
fn test_parse_function_call_response() {
    let resp = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "functionCall": { "name": "get_weather", "args": { "city": "Tokyo" } } }]
            },
            "finishReason": "STOP"
        }]
    });
    let events = parse_response(&resp).unwrap();
    assert_eq!(
        events,
        vec![
            StreamEvent::ToolCallStart {
                id: "get_weather-0".into(),
                name: "get_weather".into()
            },
            StreamEvent::ToolCallDelta {
                id: "get_weather-0".into(),
                arguments_delta: r#"{"city":"Tokyo"}"#.into()
            },
            StreamEvent::ToolCallEnd {
                id: "get_weather-0".into()
            },
            StreamEvent::MessageEnd {
                stop_reason: StopReason::ToolUse
            },
        ]
    );
}

#[test]
fn test_parse_text_response() {
    let resp = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "It's 18°C and clear in Tokyo." }] },
            "finishReason": "STOP"
        }]
    });
    let events = parse_response(&resp).unwrap();
    assert_eq!(
        events[0],
        StreamEvent::TextDelta {
            text: "It's 18°C and clear in Tokyo.".into()
        }
    );
    assert_eq!(
        events[1],
        StreamEvent::MessageEnd {
            stop_reason: StopReason::EndTurn
        }
    );
}

#[test]
fn test_parse_blocked_and_malformed() {
    let blocked = json!({"promptFeedback": {"blockReason": "SAFETY"}});
    let events = parse_response(&blocked).unwrap();
    assert!(matches!(&events[0], StreamEvent::Error { message } if message.contains("SAFETY")));

    let safety_stop = json!({"candidates": [{"finishReason": "SAFETY"}]});
    let events = parse_response(&safety_stop).unwrap();
    assert!(matches!(&events[0], StreamEvent::Error { .. }));

    assert!(matches!(
        parse_response(&json!({})),
        Err(LlmError::InvalidResponse(_))
    ));
}

#[test]
fn test_status_errors() {
    assert!(matches!(status_error(403, ""), LlmError::AuthError));
    assert!(matches!(status_error(429, ""), LlmError::RateLimited { .. }));
    match status_error(400, r#"{"error": {"message": "Invalid JSON payload"}}"#) {
        LlmError::ApiError { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Invalid JSON payload");
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_endpoint_is_network_error() {
    let provider = GeminiToolProvider::new(
        "key".to_string(),
        "gemini-1.5-flash".to_string(),
        "http://127.0.0.1:9/".to_string(),
    );
    assert_eq!(provider.model(), "gemini-1.5-flash");
    let result = provider
        .stream_with_tools(
            vec![ConversationMessage::User("hi".into())],
            None,
            vec![],
            0.1,
            64,
        )
        .await;
    assert!(matches!(result, Err(LlmError::NetworkError(_))));
}
