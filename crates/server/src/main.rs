mod api;
mod router;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use relay_mcp::McpConnection;
use relay_tool_runtime::InMemorySessionStore;

fn load_config() -> relay_core::Config {
    relay_core::config::load_dotenv();
    relay_core::Config::from_env()
}

async fn serve(config: relay_core::Config) -> anyhow::Result<()> {
    config.validate()?;
    config.log_summary();

    let mcp = Arc::new(McpConnection::sse(
        &config.mcp.server_url,
        &config.mcp.client_name,
        Duration::from_secs(config.mcp.request_timeout_secs),
    ));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = Arc::new(state::AppState::new(
        config,
        Arc::new(InMemorySessionStore::new()),
        mcp,
    ));

    // A failure here is retried on the first chat request.
    match state.engine().await {
        Ok(engine) => info!(
            provider = engine.provider_name(),
            tools = engine.tools().len(),
            "Chat engine ready"
        ),
        Err(e) => warn!("Chat engine not available yet: {:#}", e),
    }

    let app = router::build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    let config = load_config();
    serve(config).await
}
