//! Health endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use relay_mcp::ConnectionState;

use crate::state::AppState;

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[schema(value_type = String)]
    pub mcp_state: ConnectionState,
    pub engine_ready: bool,
    pub provider: Option<String>,
    pub tool_count: usize,
    /// Effective configuration with secrets redacted.
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
}

/// Reports state without connecting; a cold server shows `engine_ready: false`.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Server, engine, and tool server status", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let engine = state.current_engine().await;
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        mcp_state: state.mcp.state(),
        engine_ready: engine.is_some(),
        provider: engine.as_ref().map(|e| e.provider_name().to_string()),
        tool_count: engine.as_ref().map(|e| e.tools().len()).unwrap_or(0),
        config: state.config.redacted_summary(),
    })
}
