//! Built-in tools exposed via Model Context Protocol
//!
//! `echo_success` returns its input and `always_fail` rejects every call. The
//! pair exists to exercise success and error paths end to end.

use async_trait::async_trait;
use rust_mcp_sdk::{
    macros,
    schema::{CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};

use crate::domain::registry::{output_schema, ToolHandler, ToolRegistry};
use crate::errors::{RegistryError, ToolError};

pub const ALWAYS_FAIL_MESSAGE: &str = "Intentional failure from always_fail tool";

#[macros::mcp_tool(
    name = "echo_success",
    title = "Successful Echo",
    description = "Echoes the provided message back to the caller."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoSuccessTool {
    pub message: String,
}

#[macros::mcp_tool(
    name = "always_fail",
    title = "Always Fails",
    description = "Deliberately throws an error every time, useful for testing error handling."
)]
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AlwaysFailTool {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct EchoSuccessOutput {
    pub echoed: String,
}

/// Advertised for listing completeness; no call ever produces it.
#[derive(Debug, Deserialize, Serialize, macros::JsonSchema)]
pub struct AlwaysFailOutput {
    pub ok: bool,
}

pub struct EchoSuccess;

pub struct AlwaysFail;

#[async_trait]
impl ToolHandler for EchoSuccess {
    type Args = EchoSuccessTool;

    fn tool(&self) -> Tool {
        let mut tool = EchoSuccessTool::tool();
        tool.output_schema = output_schema(EchoSuccessOutput::json_schema());
        tool
    }

    async fn call(&self, args: EchoSuccessTool) -> Result<CallToolResult, ToolError> {
        Ok(CallToolResult {
            content: vec![ContentBlock::from(TextContent::new(
                format!("Echoed message: {}", args.message),
                None,
                None,
            ))],
            is_error: None,
            meta: None,
            structured_content: serde_json::to_value(EchoSuccessOutput {
                echoed: args.message,
            })
            .ok()
            .and_then(|value| value.as_object().cloned()),
        })
    }
}

#[async_trait]
impl ToolHandler for AlwaysFail {
    type Args = AlwaysFailTool;

    fn tool(&self) -> Tool {
        let mut tool = AlwaysFailTool::tool();
        tool.output_schema = output_schema(AlwaysFailOutput::json_schema());
        tool
    }

    async fn call(&self, args: AlwaysFailTool) -> Result<CallToolResult, ToolError> {
        Err(ToolError::execution(always_fail_message(args.reason.as_deref())))
    }
}

pub fn always_fail_message(reason: Option<&str>) -> String {
    match reason.filter(|reason| !reason.is_empty()) {
        Some(reason) => format!("{ALWAYS_FAIL_MESSAGE} (reason: {reason})"),
        None => ALWAYS_FAIL_MESSAGE.to_string(),
    }
}

pub fn build_builtin_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    registry.register(EchoSuccess)?;
    registry.register(AlwaysFail)?;
    Ok(registry)
}

/// Builds a failed tool result carrying the error message as text content.
pub fn tool_error_result(message: String) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(message, None, None))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}
