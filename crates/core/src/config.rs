use std::env;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_parse<T: std::str::FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub mcp: McpConfig,
    pub llm: LlmConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `RELAY_PROFILE`. When set (e.g. `PROD`), every key
    /// is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("RELAY_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            mcp: McpConfig::from_env_profiled(p),
            llm: LlmConfig::from_env_profiled(p),
            chat: ChatConfig::from_env_profiled(p),
        }
    }

    /// Reject settings the chat loop and MCP client cannot run with.
    pub fn validate(&self) -> Result<(), RelayError> {
        if self.chat.max_iterations == 0 {
            return Err(RelayError::Config(
                "CHAT_MAX_ITERATIONS must be at least 1".into(),
            ));
        }
        if !(self.mcp.server_url.starts_with("http://")
            || self.mcp.server_url.starts_with("https://"))
        {
            return Err(RelayError::Config(format!(
                "MCP_SERVER_URL must be an http(s) URL, got '{}'",
                self.mcp.server_url
            )));
        }
        if self.mcp.request_timeout_secs == 0 {
            return Err(RelayError::Config(
                "MCP_REQUEST_TIMEOUT_SECS must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a redacted summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:  {}:{}", self.server.host, self.server.port);
        tracing::info!("  mcp:     url={}", self.mcp.server_url);
        tracing::info!(
            "  llm:     provider={}, model={}, configured={}",
            self.llm.provider,
            self.llm.gemini_model,
            self.llm.is_configured()
        );
        tracing::info!("  chat:    max_iterations={}", self.chat.max_iterations);
    }

    /// Return a redacted view safe for API responses (no secrets).
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "mcp": {
                "server_url": self.mcp.server_url,
                "request_timeout_secs": self.mcp.request_timeout_secs,
            },
            "llm": {
                "provider": self.llm.provider,
                "model": self.llm.gemini_model,
                "configured": self.llm.is_configured(),
            },
            "chat": {
                "max_iterations": self.chat.max_iterations,
                "max_context_tokens": self.chat.max_context_tokens,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_parse(p, "PORT", 8000),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }
}

// ── MCP tool server ───────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// SSE endpoint of the remote tool server.
    pub server_url: String,
    /// Name announced in the `initialize` handshake.
    pub client_name: String,
    pub request_timeout_secs: u64,
}

impl McpConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            server_url: profiled_env_or(p, "MCP_SERVER_URL", "http://localhost:8001/sse"),
            client_name: profiled_env_or(p, "MCP_CLIENT_NAME", "relay"),
            request_timeout_secs: profiled_env_parse(p, "MCP_REQUEST_TIMEOUT_SECS", 30),
        }
    }
}

// ── LLM (Gemini) ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Only "gemini" is currently wired up.
    pub provider: String,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: Option<String>,
}

impl LlmConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            provider: profiled_env_or(p, "LLM_PROVIDER", "gemini"),
            google_api_key: profiled_env_opt(p, "GOOGLE_API_KEY"),
            gemini_model: profiled_env_or(p, "GEMINI_MODEL", "gemini-1.5-flash"),
            gemini_base_url: profiled_env_or(
                p,
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com",
            ),
            temperature: profiled_env_parse(p, "LLM_TEMPERATURE", 0.1),
            max_tokens: profiled_env_parse(p, "LLM_MAX_TOKENS", 4096),
            system_prompt: profiled_env_opt(p, "LLM_SYSTEM_PROMPT"),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider.as_str() {
            "gemini" | "google" => self.google_api_key.is_some(),
            _ => false,
        }
    }
}

// ── Chat loop ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Maximum tool calls dispatched per user message.
    pub max_iterations: usize,
    /// Approximate token budget for the in-flight conversation.
    pub max_context_tokens: usize,
}

impl ChatConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            max_iterations: profiled_env_parse(p, "CHAT_MAX_ITERATIONS", 8),
            max_context_tokens: profiled_env_parse(p, "CHAT_MAX_CONTEXT_TOKENS", 100_000),
        }
    }
}
