use std::sync::Arc;

use axum::{middleware, routing::any, Router};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;

use mcp::{server::McpServer, transport::TransportConfig};

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
    pub transport_config: TransportConfig,
}

impl AppState {
    pub fn new(server: Arc<McpServer>, transport_config: TransportConfig) -> Self {
        Self {
            server,
            transport_config,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/mcp", any(http::handlers::mcp_endpoint))
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
