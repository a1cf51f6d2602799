//! Axum HTTP handler for the web server
//!
//! Provides the single Model Context Protocol endpoint. Every POST gets its own
//! transport; anything else is rejected before a transport exists.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

use crate::errors::AppError;
use crate::mcp::rpc::{json_rpc_error, PARSE_ERROR};
use crate::mcp::server::McpServer;
use crate::mcp::transport::StreamableHttpTransport;
use crate::AppState;

pub async fn mcp_endpoint(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::method_not_allowed(method.as_str()));
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(_) => {
            return Ok((
                StatusCode::BAD_REQUEST,
                Json(json_rpc_error(None, PARSE_ERROR, "Parse error")),
            )
                .into_response())
        }
    };

    let transport = StreamableHttpTransport::new(state.transport_config);
    serve_with_transport(Arc::clone(&state.server), transport, &headers, payload).await
}

/// Drives one exchange on `transport`. The close guard is armed before the
/// request is handled so that dropping this future (client disconnect) still
/// closes the transport.
pub async fn serve_with_transport(
    server: Arc<McpServer>,
    mut transport: StreamableHttpTransport,
    headers: &HeaderMap,
    payload: Value,
) -> Result<Response, AppError> {
    let _close_on_drop = transport.handle().close_on_drop();

    transport.connect(server)?;
    let response = transport.handle_request(headers, payload).await?;
    transport.close();

    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_mcp_sdk::{
        macros,
        schema::{CallToolResult, ContentBlock, TextContent, Tool},
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::domain::registry::{ToolHandler, ToolRegistry};
    use crate::errors::ToolError;
    use crate::mcp::transport::TransportConfig;

    #[macros::mcp_tool(name = "slow_echo", description = "Echoes after a delay")]
    #[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
    struct SlowEchoTool {
        delay_ms: u64,
    }

    struct SlowEcho;

    #[async_trait]
    impl ToolHandler for SlowEcho {
        type Args = SlowEchoTool;

        fn tool(&self) -> Tool {
            SlowEchoTool::tool()
        }

        async fn call(&self, args: SlowEchoTool) -> Result<CallToolResult, ToolError> {
            tokio::time::sleep(Duration::from_millis(args.delay_ms)).await;
            Ok(CallToolResult {
                content: vec![ContentBlock::from(TextContent::new(
                    "done".to_string(),
                    None,
                    None,
                ))],
                is_error: None,
                meta: None,
                structured_content: None,
            })
        }
    }

    fn slow_server() -> Arc<McpServer> {
        let mut registry = ToolRegistry::new();
        registry.register(SlowEcho).expect("register slow_echo");
        Arc::new(McpServer::new(registry))
    }

    fn slow_call(delay_ms: u64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": "slow_echo", "arguments": { "delay_ms": delay_ms } }
        })
    }

    #[tokio::test]
    async fn disconnect_during_tool_call_closes_transport() {
        let transport = StreamableHttpTransport::new(TransportConfig::default());
        let handle = transport.handle();
        let headers = HeaderMap::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(20),
            serve_with_transport(slow_server(), transport, &headers, slow_call(5_000)),
        )
        .await;

        assert!(outcome.is_err(), "handler should still be running");
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn completed_exchange_closes_transport() {
        let transport = StreamableHttpTransport::new(TransportConfig::default());
        let handle = transport.handle();

        let response = serve_with_transport(slow_server(), transport, &HeaderMap::new(), slow_call(0))
            .await
            .expect("exchange completes");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(handle.is_closed());
    }
}
