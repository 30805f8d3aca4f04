// Project tracking tools: list, status, search, add, update

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{json_schema_object, json_schema_string, optional_str, required_str, Tool};
use anyhow::Result;
use coordinator_core::{ProjectStore, SecurityValidator};
use serde_json::Value;
use std::sync::Arc;

/// Tool to list every tracked project
pub struct ListProjectsTool {
    store: ProjectStore,
}

impl ListProjectsTool {
    pub fn new(store: ProjectStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for ListProjectsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "list_projects".to_string(),
            description: "List all Xcode projects being tracked".to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.store.list().await?))
    }
}

/// Tool to show one project's details and status timeline
pub struct GetProjectStatusTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl GetProjectStatusTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for GetProjectStatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_project_status".to_string(),
            description: "Get the current status and details of a specific project".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "projectName": json_schema_string("Name of the project")
                }),
                vec!["projectName"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let name = required_str(&arguments, "projectName")?;
        let name = self.validator.validate_project_name(&name)?;
        Ok(CallToolResult::text(self.store.get_status(name).await?))
    }
}

/// Tool to search the pattern library, project notes, and technology tags
pub struct SearchCodePatternsTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl SearchCodePatternsTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for SearchCodePatternsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "search_code_patterns".to_string(),
            description: "Search for code patterns across all projects".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "pattern": json_schema_string("Code pattern or keyword to search for")
                }),
                vec!["pattern"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let pattern = required_str(&arguments, "pattern")?;
        let pattern = self.validator.validate_search_pattern(&pattern)?;
        Ok(CallToolResult::text(self.store.search(pattern).await?))
    }
}

/// Tool to start tracking a project directory
pub struct AddProjectTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl AddProjectTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for AddProjectTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add_project".to_string(),
            description: "Add a new Xcode project to track".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "name": json_schema_string("Project name"),
                    "path": json_schema_string("Path to project"),
                    "description": json_schema_string("Project description")
                }),
                vec!["name", "path"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let name = required_str(&arguments, "name")?;
        let path = required_str(&arguments, "path")?;
        let description = optional_str(&arguments, "description");

        let limits = self.validator.config();
        let name = self.validator.validate_project_name(&name)?;
        let path = self.validator.validate_project_path(&path)?;
        let description = description
            .map(|d| {
                self.validator
                    .validate_text(&d, limits.max_description_length, "description")
            })
            .transpose()?;
        self.validator.verify_path_exists(&path)?;

        Ok(CallToolResult::text(self.store.add(name, path, description).await?))
    }
}

/// Tool to change a project's status or notes
pub struct UpdateProjectStatusTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl UpdateProjectStatusTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateProjectStatusTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "update_project_status".to_string(),
            description: "Update the status or notes for a project".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "projectName": json_schema_string("Name of the project"),
                    "status": json_schema_string("New status"),
                    "notes": json_schema_string("Additional notes")
                }),
                vec!["projectName"],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let name = required_str(&arguments, "projectName")?;
        let limits = self.validator.config();

        let name = self.validator.validate_project_name(&name)?;
        let status = optional_str(&arguments, "status")
            .map(|s| self.validator.validate_text(&s, limits.max_status_length, "status"))
            .transpose()?;
        let notes = optional_str(&arguments, "notes")
            .map(|n| self.validator.validate_text(&n, limits.max_notes_length, "notes"))
            .transpose()?;

        Ok(CallToolResult::text(
            self.store.update_status(name, status, notes).await?,
        ))
    }
}
