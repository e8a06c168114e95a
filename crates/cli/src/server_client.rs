//! HTTP client for the relay chat API in remote mode.
//!
//! When `--server` is set, the CLI delegates every message to
//! `POST /api/chat`, so the CLI and other clients share one session store.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client for the relay server REST API.
pub struct ServerClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallInfo {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallInfo>,
}

/// Session summary as listed by `GET /api/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub message_count: usize,
    #[serde(default)]
    pub last_message: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnInfo {
    pub role: String,
    pub content: String,
}

impl ServerClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the server is reachable.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(std::time::Duration::from_secs(3))
            .send()
            .await
            .context("server not reachable")?;
        if !resp.status().is_success() {
            bail!("health check returned {}", resp.status());
        }
        Ok(())
    }

    /// Send one message. Omitting `session_id` starts a new session.
    pub async fn chat(&self, message: &str, session_id: Option<&str>) -> Result<ChatReply> {
        let url = format!("{}/api/chat", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&ChatRequestBody {
                message,
                session_id,
            })
            .send()
            .await
            .context("failed to send chat message")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("server returned {}: {}", status, error_message(&body));
        }

        resp.json().await.context("failed to parse chat reply")
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let url = format!("{}/api/history", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to list sessions")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("server returned {}: {}", status, error_message(&body));
        }

        resp.json().await.context("failed to parse sessions list")
    }

    pub async fn history(&self, session_id: &str) -> Result<Vec<TurnInfo>> {
        let url = format!("{}/api/history/{}", self.base_url, session_id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to fetch history")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("server returned {}: {}", status, error_message(&body));
        }

        resp.json().await.context("failed to parse history")
    }
}

/// Pull `error` out of a JSON error body, or return the body as-is.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or_else(|| body.to_string())
}
