//! The central Model Context Protocol engine
//!
//! Provides JSON-RPC decoding, method routing, protocol version negotiation
//! (`initialize`) and dispatch of `tools/call` into the tool registry. A single
//! `McpServer` is built at startup and shared read-only by every transport.

use rust_mcp_sdk::schema::{
    CallToolRequest, CallToolRequestParams, Implementation, InitializeRequest, InitializeResult,
    JsonrpcMessage, JsonrpcRequest, ListToolsRequest, ListToolsResult, PingRequest, ServerCapabilities,
    ServerCapabilitiesTools,
};
use serde_json::{json, Value};
use tracing::info;

use crate::domain::{registry::ToolRegistry, tools::build_builtin_registry};
use crate::errors::RegistryError;
use crate::mcp::rpc::{
    is_json_rpc_error, json_rpc_error, json_rpc_result, request_id_to_value,
    tool_error_to_json_rpc, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
};

pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

pub struct McpServer {
    registry: ToolRegistry,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn with_builtin_tools() -> Result<Self, RegistryError> {
        Ok(Self::new(build_builtin_registry()?))
    }

    /// Handles one decoded JSON-RPC message. Returns `None` when the message
    /// does not warrant a response (notifications, client responses).
    pub async fn handle_message(&self, payload: Value) -> Option<Value> {
        if !payload.is_object() {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        if has_invalid_request_id(&payload) {
            return Some(json_rpc_error(None, INVALID_REQUEST, "Invalid Request"));
        }

        let request_id = payload.get("id").cloned();
        let parsed: JsonrpcMessage = match serde_json::from_value(payload) {
            Ok(message) => message,
            Err(_) => return Some(json_rpc_error(request_id, INVALID_REQUEST, "Invalid Request")),
        };

        match parsed {
            JsonrpcMessage::Request(request) => {
                if let Err(error_response) = validate_request_shape(&request) {
                    return Some(error_response);
                }

                let request_id = request_id_to_value(request.id);
                if request.method.trim().is_empty() {
                    return Some(json_rpc_error(Some(request_id), INVALID_REQUEST, "Invalid Request"));
                }

                Some(
                    self.handle_request(
                        Some(request_id),
                        request.method,
                        request.params.map(Value::Object),
                    )
                    .await,
                )
            }
            JsonrpcMessage::Notification(notification) => {
                info!(method = %notification.method, "mcp notification received");
                None
            }
            JsonrpcMessage::ResultResponse(_) | JsonrpcMessage::ErrorResponse(_) => None,
        }
    }

    pub async fn handle_request(&self, id: Option<Value>, method: String, params: Option<Value>) -> Value {
        let audit_params = redact_audit_params(params.as_ref());

        let response = match method.as_str() {
            "initialize" => {
                let protocol_version = negotiate_protocol_version(params.as_ref());

                let initialize_result = InitializeResult {
                    server_info: Implementation {
                        name: env!("CARGO_PKG_NAME").to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                        title: None,
                        description: None,
                        icons: vec![],
                        website_url: None,
                    },
                    capabilities: ServerCapabilities {
                        tools: Some(ServerCapabilitiesTools {
                            list_changed: Some(false),
                        }),
                        ..Default::default()
                    },
                    protocol_version: protocol_version.to_string(),
                    instructions: None,
                    meta: None,
                };

                json_rpc_result(
                    id,
                    serde_json::to_value(initialize_result).expect("initialize result serialization"),
                )
            }
            "ping" => json_rpc_result(id, json!({})),
            "tools/list" => json_rpc_result(
                id,
                serde_json::to_value(ListToolsResult {
                    meta: None,
                    next_cursor: None,
                    tools: self.registry.list(),
                })
                .expect("tools list result serialization"),
            ),
            "tools/call" => self.handle_tools_call(id, params).await,
            _ => json_rpc_error(id, METHOD_NOT_FOUND, "Method not found"),
        };

        info!(
            method = %method,
            params = %audit_params,
            outcome = if is_json_rpc_error(&response) { "failure" } else { "success" },
            "mcp action audited"
        );

        response
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> Value {
        let Some(raw_params) = params else {
            return json_rpc_error(id, INVALID_PARAMS, "Invalid params");
        };

        let tool_call: CallToolRequestParams = match serde_json::from_value(raw_params) {
            Ok(value) => value,
            Err(_) => return json_rpc_error(id, INVALID_PARAMS, "Invalid params"),
        };

        match self.registry.invoke(&tool_call.name, tool_call.arguments).await {
            Ok(result) => json_rpc_result(
                id,
                serde_json::to_value(result).expect("tool result serialization"),
            ),
            Err(err) => {
                info!(tool = %tool_call.name, error = %err, "tool call failed");
                tool_error_to_json_rpc(id, err)
            }
        }
    }
}

/// Requests must carry a string or integer id; `null` or fractional ids
/// cannot be correlated with a response.
pub fn has_invalid_request_id(payload: &Value) -> bool {
    if payload.get("method").is_none() {
        return false;
    }

    match payload.get("id") {
        None | Some(Value::String(_)) => false,
        Some(Value::Number(number)) => number.as_i64().is_none(),
        Some(_) => true,
    }
}

pub fn validate_request_shape(request: &JsonrpcRequest) -> Result<(), Value> {
    let payload = serde_json::to_value(request).expect("jsonrpc request serialization");
    let request_id = Some(request_id_to_value(request.id.clone()));

    let valid = match request.method.as_str() {
        "tools/call" => serde_json::from_value::<CallToolRequest>(payload).is_ok(),
        "tools/list" => serde_json::from_value::<ListToolsRequest>(payload).is_ok(),
        "ping" => serde_json::from_value::<PingRequest>(payload).is_ok(),
        "initialize" => serde_json::from_value::<InitializeRequest>(payload).is_ok(),
        _ => true,
    };

    if valid {
        Ok(())
    } else {
        Err(json_rpc_error(request_id, INVALID_PARAMS, "Invalid params"))
    }
}

/// Echoes the client's version when supported, otherwise offers the latest.
pub fn negotiate_protocol_version(params: Option<&Value>) -> &'static str {
    let offered_version = params
        .and_then(Value::as_object)
        .and_then(|object| object.get("protocolVersion"))
        .and_then(Value::as_str)
        .map(str::trim);

    offered_version
        .and_then(|offered| {
            SUPPORTED_PROTOCOL_VERSIONS
                .iter()
                .find(|supported| **supported == offered)
        })
        .copied()
        .unwrap_or(LATEST_PROTOCOL_VERSION)
}

pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_audit_value).unwrap_or(Value::Null)
}

pub fn redact_audit_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    if is_sensitive_key(key) {
                        (key.clone(), Value::String("[REDACTED]".to_string()))
                    } else {
                        (key.clone(), redact_audit_value(item))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_audit_value).collect()),
        _ => value.clone(),
    }
}

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    matches!(
        normalized.as_str(),
        "authorization" | "bearer" | "credentials" | "credential" | "api_key" | "apikey"
    ) || normalized.contains("token")
        || normalized.contains("secret")
        || normalized.contains("password")
        || normalized.contains("credential")
}
