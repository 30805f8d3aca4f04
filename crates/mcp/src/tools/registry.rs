// MCP tool trait, registry, and argument helpers

use crate::protocol::{CallToolResult, ToolSchema};
use anyhow::Result;
use coordinator_core::CoordinatorError;
use serde_json::Value;
use std::sync::Arc;

/// Tool executor trait
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool schema for MCP
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with an arguments object
    async fn execute(&self, arguments: Value) -> Result<CallToolResult>;
}

/// Tool registry, listed in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<(String, Arc<dyn Tool>)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any earlier tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        match self.tools.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = tool,
            None => self.tools.push((name, tool)),
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tool)| tool.clone())
    }

    /// List all tool schemas
    pub fn list_schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|(_, t)| t.schema()).collect()
    }
}

// Helper functions for creating tool schemas

pub fn json_schema_object(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

pub fn json_schema_string(description: &str) -> Value {
    serde_json::json!({
        "type": "string",
        "description": description
    })
}

pub fn json_schema_number(description: &str) -> Value {
    serde_json::json!({
        "type": "number",
        "description": description
    })
}

// Helper functions for reading tool arguments

/// A string argument that must be present
pub fn required_str(arguments: &Value, field: &str) -> std::result::Result<String, CoordinatorError> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoordinatorError::InvalidArguments(format!("{} is required", field)))
}

/// A string argument that may be omitted; values of other types count as omitted
pub fn optional_str(arguments: &Value, field: &str) -> Option<String> {
    arguments.get(field).and_then(Value::as_str).map(str::to_string)
}

/// A whole-number argument that may be omitted; non-integral numbers are truncated
pub fn optional_i64(arguments: &Value, field: &str) -> Option<i64> {
    let value = arguments.get(field)?;
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
}
