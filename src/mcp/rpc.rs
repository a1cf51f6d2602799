//! JSON-RPC protocol representations and formatting utilities
//!
//! Provides standardized mapping of tool errors to valid JSON-RPC payloads.

use serde_json::{json, Value};
use rust_mcp_sdk::schema::{JsonrpcErrorResponse, JsonrpcResultResponse, RequestId, Result as McpResult, RpcError};
use crate::domain::tools::tool_error_result;
use crate::errors::ToolError;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
/// Implementation-defined server error, used for transport-level rejections.
pub const SERVER_ERROR: i32 = -32000;

pub fn is_json_rpc_error(value: &Value) -> bool {
    value.get("error").is_some()
}

/// Unknown tools and argument mismatches are protocol errors. Execution
/// failures are successful responses carrying an `isError` tool result.
pub fn tool_error_to_json_rpc(id: Option<Value>, err: ToolError) -> Value {
    let message = err.to_string();
    match err {
        ToolError::UnknownTool { name } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            &message,
            Some(json!({
                "code": "tool_not_found",
                "message": "unknown tool name",
                "details": { "name": name }
            })),
        ),
        ToolError::InvalidInput { name, reason } => json_rpc_error_with_data(
            id,
            INVALID_PARAMS,
            &message,
            Some(json!({
                "code": "invalid_arguments",
                "message": reason,
                "details": { "name": name }
            })),
        ),
        ToolError::Execution(message) => json_rpc_result(
            id,
            serde_json::to_value(tool_error_result(message)).expect("tool error result serialization"),
        ),
    }
}

pub fn json_rpc_error(id: Option<Value>, code: i32, message: &str) -> Value {
    json_rpc_error_with_data(id, code, message, None)
}

pub fn json_rpc_error_with_data(
    id: Option<Value>,
    code: i32,
    message: &str,
    data: Option<Value>,
) -> Value {
    let response = JsonrpcErrorResponse::new(
        RpcError {
            code: i64::from(code),
            data,
            message: message.to_string(),
        },
        id.as_ref().and_then(value_to_request_id),
    );
    serde_json::to_value(response).expect("jsonrpc error response serialization")
}

pub fn json_rpc_result(id: Option<Value>, result: Value) -> Value {
    if let Some(request_id) = id.as_ref().and_then(value_to_request_id) {
        let extra = result.as_object().cloned();
        let response = JsonrpcResultResponse::new(request_id, McpResult { meta: None, extra });
        return serde_json::to_value(response).expect("jsonrpc result response serialization");
    }

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": result
    })
}

pub fn value_to_request_id(value: &Value) -> Option<RequestId> {
    if let Some(string_id) = value.as_str() {
        return Some(RequestId::String(string_id.to_string()));
    }

    value.as_i64().map(RequestId::Integer)
}

pub fn request_id_to_value(id: RequestId) -> Value {
    match id {
        RequestId::String(value) => Value::String(value),
        RequestId::Integer(value) => Value::Number(value.into()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn unknown_tool_maps_to_invalid_params_with_data() {
        let value = tool_error_to_json_rpc(Some(json!(7)), ToolError::unknown_tool("missing"));

        assert_eq!(value["id"], 7);
        assert_eq!(value["error"]["code"], INVALID_PARAMS);
        assert_eq!(value["error"]["message"], "Tool missing not found");
        assert_eq!(value["error"]["data"]["code"], "tool_not_found");
        assert_eq!(value["error"]["data"]["details"]["name"], "missing");
    }

    #[test]
    fn execution_failure_maps_to_error_result() {
        let value = tool_error_to_json_rpc(Some(json!(8)), ToolError::execution("boom"));

        assert!(!is_json_rpc_error(&value));
        assert_eq!(value["id"], 8);
        assert_eq!(value["result"]["isError"], true);
        assert_eq!(value["result"]["content"][0]["text"], "boom");
    }

    #[test]
    fn result_keeps_string_ids() {
        let value = json_rpc_result(Some(json!("abc")), json!({ "ok": true }));

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], "abc");
        assert_eq!(value["result"]["ok"], true);
        assert!(!is_json_rpc_error(&value));
    }

    #[test]
    fn error_without_id_serializes() {
        let value = json_rpc_error(None, PARSE_ERROR, "Parse error");

        assert!(is_json_rpc_error(&value));
        assert_eq!(value["error"]["code"], PARSE_ERROR);
    }
}
