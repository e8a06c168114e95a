//! HTTP endpoint modules.
//!
//! Each sub-module owns a single responsibility area; shared types live here.

mod chat;
pub mod doc;
mod health;
mod history;

use std::fmt::Display;

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct QueryErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<QueryErrorResponse>);

pub(crate) fn api_error(status: StatusCode, error: impl Display) -> ApiError {
    (
        status,
        Json(QueryErrorResponse {
            error: error.to_string(),
        }),
    )
}

pub(crate) fn internal_error(error: impl Display) -> ApiError {
    tracing::error!("{}", error);
    api_error(StatusCode::INTERNAL_SERVER_ERROR, error)
}

// ── Re-exports ───────────────────────────────────────────────────

pub use chat::chat;
pub use health::health;
pub use history::{history_get, history_list};
