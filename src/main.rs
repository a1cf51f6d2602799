use std::sync::Arc;

use mcp_http_demo::{build_app, config::Config, logging, mcp::server::McpServer, AppState};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;
    let server = Arc::new(McpServer::with_builtin_tools()?);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(server, config.transport_config());
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        json_response = config.json_response,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
