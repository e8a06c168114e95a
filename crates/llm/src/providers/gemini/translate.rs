//! Translation between provider-agnostic conversation types and the Gemini
//! `generateContent` format.

use serde_json::{json, Map, Value};

use relay_tool_runtime::{conversation::ConversationMessage, tool::ToolDefinition};

/// Schema keywords the Gemini function-declaration validator rejects.
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &[
    "$schema",
    "additionalProperties",
    "default",
    "examples",
    "title",
];

/// Strip keywords Gemini does not accept. Property *names* under
/// `properties` are kept even when they collide with a stripped keyword.
pub(super) fn sanitize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                if UNSUPPORTED_SCHEMA_KEYS.contains(&key.as_str()) {
                    continue;
                }
                let cleaned = if key == "properties" {
                    match value {
                        Value::Object(props) => Value::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), sanitize_schema(prop)))
                                .collect(),
                        ),
                        other => other.clone(),
                    }
                } else {
                    sanitize_schema(value)
                };
                out.insert(key.clone(), cleaned);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sanitize_schema).collect()),
        other => other.clone(),
    }
}

/// Translate a [`ToolDefinition`] into a Gemini function declaration.
pub(super) fn tool_definition_to_gemini(tool: &ToolDefinition) -> Value {
    let mut decl = json!({
        "name": tool.name,
        "description": tool.description,
    });
    let parameters = sanitize_schema(&tool.input_schema);
    // Gemini rejects OBJECT parameters with no properties; omit them instead.
    let has_properties = parameters
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty());
    if has_properties {
        decl["parameters"] = parameters;
    }
    decl
}

/// Translate a [`ConversationMessage`] into a Gemini `contents` entry.
pub(super) fn message_to_gemini(msg: &ConversationMessage) -> Value {
    match msg {
        ConversationMessage::User(text) => json!({
            "role": "user",
            "parts": [{ "text": text }],
        }),
        ConversationMessage::Assistant(content) => {
            let mut parts: Vec<Value> = Vec::new();
            if let Some(text) = content.text.as_ref().filter(|t| !t.is_empty()) {
                parts.push(json!({ "text": text }));
            }
            for tc in &content.tool_calls {
                parts.push(json!({
                    "functionCall": {
                        "name": tc.name,
                        "args": tc.input,
                    }
                }));
            }
            if parts.is_empty() {
                parts.push(json!({ "text": "" }));
            }
            json!({
                "role": "model",
                "parts": parts,
            })
        }
        ConversationMessage::ToolResult(result) => json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": result.tool_name,
                    "response": { "result": result.content },
                }
            }],
        }),
    }
}

/// Full request body for `generateContent`.
pub(super) fn build_request_body(
    messages: &[ConversationMessage],
    system_prompt: Option<&str>,
    tools: &[ToolDefinition],
    temperature: f32,
    max_tokens: u32,
) -> Value {
    let contents: Vec<Value> = messages.iter().map(message_to_gemini).collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": {
            "temperature": temperature,
            "maxOutputTokens": max_tokens,
        },
    });

    if !tools.is_empty() {
        let declarations: Vec<Value> = tools.iter().map(tool_definition_to_gemini).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }

    if let Some(system) = system_prompt {
        body["system_instruction"] = json!({
            "parts": [{ "text": system }],
        });
    }

    body
}
