//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI spec, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "relay API",
        version = "0.1.0",
        description = "Chat with an LLM that calls tools hosted on a remote MCP server.",
    ),
    tags(
        (name = "Health", description = "Server readiness and tool server state"),
        (name = "Chat", description = "Tool-calling chat turns"),
        (name = "History", description = "Stored chat sessions"),
    ),
    paths(
        crate::api::health::health,
        crate::api::chat::chat,
        crate::api::history::history_list,
        crate::api::history::history_get,
    ),
    components(schemas(
        crate::api::QueryErrorResponse,
        crate::api::health::HealthResponse,
        crate::api::chat::ChatRequest,
        crate::api::chat::ChatResponse,
        crate::api::chat::ToolCallView,
        crate::api::history::SessionSummaryView,
        crate::api::history::TurnView,
    ))
)]
pub struct ApiDoc;
