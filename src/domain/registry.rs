//! Tool registry backing the `tools/list` and `tools/call` methods
//!
//! Tools are registered once during startup and looked up by name afterwards.
//! Arguments are deserialised into the tool's typed argument struct before the
//! handler runs, which is where input-schema validation happens.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_mcp_sdk::schema::{CallToolResult, Tool, ToolOutputSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::{RegistryError, ToolError};

/// Converts a derived JSON schema into the typed output schema carried by
/// [`Tool`]. Returns `None` when the schema does not describe an object.
pub fn output_schema(schema: Map<String, Value>) -> Option<ToolOutputSchema> {
    serde_json::from_value(Value::Object(schema)).ok()
}

#[async_trait]
pub trait ToolHandler: Send + Sync + 'static {
    type Args: DeserializeOwned + Send;

    fn tool(&self) -> Tool;

    async fn call(&self, args: Self::Args) -> Result<CallToolResult, ToolError>;
}

#[async_trait]
trait ErasedToolHandler: Send + Sync {
    async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError>;
}

#[async_trait]
impl<T: ToolHandler> ErasedToolHandler for T {
    async fn invoke(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult, ToolError> {
        let args = serde_json::from_value::<T::Args>(Value::Object(arguments))
            .map_err(|err| ToolError::invalid_input(name, err))?;
        self.call(args).await
    }
}

struct RegisteredTool {
    tool: Tool,
    handler: Box<dyn ErasedToolHandler>,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: ToolHandler>(&mut self, handler: T) -> Result<(), RegistryError> {
        let tool = handler.tool();
        let name = tool.name.clone();
        if self.index.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }

        self.index.insert(name, self.tools.len());
        self.tools.push(RegisteredTool {
            tool,
            handler: Box::new(handler),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.index
            .get(name)
            .and_then(|position| self.tools.get(*position))
            .map(|entry| &entry.tool)
    }

    /// Tools in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.tools.iter().map(|entry| entry.tool.clone()).collect()
    }

    pub async fn invoke(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
    ) -> Result<CallToolResult, ToolError> {
        let entry = self
            .index
            .get(name)
            .and_then(|position| self.tools.get(*position))
            .ok_or_else(|| ToolError::unknown_tool(name))?;

        entry
            .handler
            .invoke(name, arguments.unwrap_or_default())
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ToolRegistry;
    use crate::domain::tools::{AlwaysFail, EchoSuccess};
    use crate::errors::{RegistryError, ToolError};

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(EchoSuccess).expect("register echo_success");
        registry.register(AlwaysFail).expect("register always_fail");
        registry
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = registry();
        let error = registry
            .register(EchoSuccess)
            .expect_err("duplicate must fail");

        assert_eq!(error, RegistryError::DuplicateTool("echo_success".to_string()));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lists_tools_in_registration_order() {
        let listings = serde_json::to_value(registry().list()).expect("serialize tools");

        assert_eq!(listings.as_array().map(Vec::len), Some(2));
        assert_eq!(listings[0]["name"], "echo_success");
        assert_eq!(listings[0]["title"], "Successful Echo");
        assert_eq!(listings[0]["inputSchema"]["type"], "object");
        assert_eq!(
            listings[0]["outputSchema"]["properties"]["echoed"]["type"],
            "string"
        );
        assert_eq!(listings[1]["name"], "always_fail");
        assert_eq!(
            listings[1]["outputSchema"]["properties"]["ok"]["type"],
            "boolean"
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let error = registry()
            .invoke("does_not_exist", None)
            .await
            .expect_err("unknown tool must fail");

        assert_eq!(error, ToolError::unknown_tool("does_not_exist"));
    }

    #[tokio::test]
    async fn arguments_are_validated_before_handler_runs() {
        let arguments = json!({ "message": 42 });
        let error = registry()
            .invoke("echo_success", arguments.as_object().cloned())
            .await
            .expect_err("non-string message must fail");

        assert!(matches!(error, ToolError::InvalidInput { ref name, .. } if name == "echo_success"));
    }

    #[tokio::test]
    async fn missing_required_argument_is_invalid() {
        let error = registry()
            .invoke("echo_success", None)
            .await
            .expect_err("missing message must fail");

        assert!(matches!(error, ToolError::InvalidInput { .. }));
    }
}
