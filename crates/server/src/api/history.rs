//! Session history endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use relay_tool_runtime::{ConversationTurn, SessionSummary};

use crate::state::AppState;

use super::{internal_error, ApiError, QueryErrorResponse};

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SessionSummaryView {
    pub id: String,
    pub message_count: usize,
    /// Empty when the session has no turns.
    pub last_message: String,
    #[schema(value_type = Option<String>, format = DateTime)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<SessionSummary> for SessionSummaryView {
    fn from(s: SessionSummary) -> Self {
        Self {
            id: s.id,
            message_count: s.message_count,
            last_message: s.last_message,
            timestamp: s.timestamp,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TurnView {
    /// `user` or `assistant`.
    pub role: String,
    pub content: String,
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Utc>,
}

impl From<ConversationTurn> for TurnView {
    fn from(turn: ConversationTurn) -> Self {
        Self {
            role: turn.role.to_string(),
            content: turn.content,
            timestamp: turn.timestamp,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/history",
    tag = "History",
    responses(
        (status = 200, description = "All sessions", body = Vec<SessionSummaryView>),
        (status = 500, description = "Session store failure", body = QueryErrorResponse)
    )
)]
pub async fn history_list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SessionSummaryView>>, ApiError> {
    let sessions = state.sessions.list_sessions().await.map_err(internal_error)?;
    Ok(Json(sessions.into_iter().map(SessionSummaryView::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/history/{id}",
    tag = "History",
    params(
        ("id" = String, Path, description = "Session ID")
    ),
    responses(
        (status = 200, description = "Ordered turns; empty for an unknown session", body = Vec<TurnView>),
        (status = 500, description = "Session store failure", body = QueryErrorResponse)
    )
)]
pub async fn history_get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TurnView>>, ApiError> {
    let turns = state.sessions.get_history(&id).await.map_err(internal_error)?;
    Ok(Json(turns.into_iter().map(TurnView::from).collect()))
}
