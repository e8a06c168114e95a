//! Chat endpoint.
//!
//! SRP: run one user message through the tool loop and persist the exchange.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use relay_tool_runtime::{Role, ToolCallSummary};

use crate::state::AppState;

use super::{api_error, internal_error, ApiError, QueryErrorResponse};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ChatRequest {
    pub message: String,
    /// Omit to start a new session.
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ToolCallView {
    pub name: String,
    #[schema(value_type = Object)]
    pub args: serde_json::Value,
}

impl From<ToolCallSummary> for ToolCallView {
    fn from(summary: ToolCallSummary) -> Self {
        Self {
            name: summary.name,
            args: summary.args,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub tool_calls: Vec<ToolCallView>,
}

#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "Chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant answer (loop errors are reported in the text)", body = ChatResponse),
        (status = 400, description = "Empty message", body = QueryErrorResponse),
        (status = 503, description = "LLM or tool server unavailable", body = QueryErrorResponse),
        (status = 500, description = "Session store failure", body = QueryErrorResponse)
    )
)]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if req.message.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "message must not be empty"));
    }

    let engine = state.engine().await.map_err(|e| {
        warn!("Chat engine not available: {:#}", e);
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Chat engine not available: {:#}", e),
        )
    })?;

    let requested = req.session_id.filter(|id| !id.trim().is_empty());
    let history = match &requested {
        Some(id) => state
            .sessions
            .get_history(id)
            .await
            .map_err(internal_error)?,
        None => Vec::new(),
    };

    // Runs to completion even if the client goes away. Nothing touches the
    // store until it has finished, new sessions included, so an abandoned
    // request leaves no trace.
    let message = req.message.clone();
    let outcome = tokio::spawn(async move { engine.run(&history, &message).await })
        .await
        .map_err(|e| internal_error(format!("chat task failed: {}", e)))?;

    let session_id = match requested {
        Some(id) => id,
        None => state.sessions.create_session().await.map_err(internal_error)?,
    };

    if let Some(e) = &outcome.error {
        warn!(session = %session_id, error = %e, "Chat loop ended with an error");
    }
    let response = outcome.response_text();

    state
        .sessions
        .add_message(&session_id, Role::User, &req.message)
        .await
        .map_err(internal_error)?;
    state
        .sessions
        .add_message(&session_id, Role::Assistant, &response)
        .await
        .map_err(internal_error)?;

    let tool_calls: Vec<ToolCallView> = outcome
        .tool_call_summaries()
        .into_iter()
        .map(ToolCallView::from)
        .collect();
    info!(session = %session_id, tool_calls = tool_calls.len(), "Chat turn complete");

    Ok(Json(ChatResponse {
        response,
        session_id,
        tool_calls,
    }))
}
