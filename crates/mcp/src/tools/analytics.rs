// Analytics report and task tools, registered when extended tools are enabled

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_number, json_schema_object, json_schema_string, optional_i64, optional_str,
    required_str, Tool,
};
use anyhow::Result;
use coordinator_core::analytics::HEAT_MAP_DAYS;
use coordinator_core::{CoordinatorError, ProjectStore, SecurityValidator};
use serde_json::Value;
use std::sync::Arc;

/// Longest window the heat map accepts
const MAX_HEAT_MAP_DAYS: i64 = 365;

/// Tool to show how long a project spent in each status
pub struct StatusTimelineTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl StatusTimelineTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for StatusTimelineTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_status_timeline".to_string(),
            description: "Show how long a project has spent in each status".to_string(),
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
        Ok(CallToolResult::text(self.store.status_timeline(name).await?))
    }
}

/// Tool to rank projects by recent activity
pub struct ActivityHeatMapTool {
    store: ProjectStore,
}

impl ActivityHeatMapTool {
    pub fn new(store: ProjectStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for ActivityHeatMapTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_activity_heatmap".to_string(),
            description: "Rank projects by recent activity with a daily breakdown".to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "days": json_schema_number("Number of days to include (default 7)")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let days = optional_i64(&arguments, "days").unwrap_or(HEAT_MAP_DAYS);
        if !(1..=MAX_HEAT_MAP_DAYS).contains(&days) {
            return Err(CoordinatorError::InvalidArguments(format!(
                "days must be between 1 and {}",
                MAX_HEAT_MAP_DAYS
            ))
            .into());
        }
        Ok(CallToolResult::text(self.store.heat_map(Some(days)).await?))
    }
}

/// Tool to summarize technology usage across projects
pub struct TechnologyTrendsTool {
    store: ProjectStore,
}

impl TechnologyTrendsTool {
    pub fn new(store: ProjectStore) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for TechnologyTrendsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_technology_trends".to_string(),
            description: "Summarize technology usage, emerging technologies, and recent adoptions"
                .to_string(),
            input_schema: json_schema_object(serde_json::json!({}), vec![]),
        }
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        Ok(CallToolResult::text(self.store.technology_trends().await?))
    }
}

/// Tool to score project health, for one project or all of them
pub struct ProjectHealthTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl ProjectHealthTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for ProjectHealthTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "get_project_health".to_string(),
            description: "Health scores with recommendations; omit projectName for every project"
                .to_string(),
            input_schema: json_schema_object(
                serde_json::json!({
                    "projectName": json_schema_string("Name of the project")
                }),
                vec![],
            ),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let report = match optional_str(&arguments, "projectName") {
            Some(name) => {
                let name = self.validator.validate_project_name(&name)?;
                self.store.project_health(name).await?
            }
            None => self.store.health_report().await?,
        };
        Ok(CallToolResult::text(report))
    }
}

/// Tool to open a task on a project
pub struct AddProjectTaskTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl AddProjectTaskTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for AddProjectTaskTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "add_project_task".to_string(),
            description: "Add an open task to a project".to_string(),
            input_schema: task_schema(),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let (name, task) = task_arguments(&self.validator, &arguments)?;
        Ok(CallToolResult::text(self.store.add_task(name, task).await?))
    }
}

/// Tool to mark an open task as completed
pub struct CompleteProjectTaskTool {
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
}

impl CompleteProjectTaskTool {
    pub fn new(store: ProjectStore, validator: Arc<SecurityValidator>) -> Self {
        Self { store, validator }
    }
}

#[async_trait::async_trait]
impl Tool for CompleteProjectTaskTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "complete_project_task".to_string(),
            description: "Mark one of a project's open tasks as completed".to_string(),
            input_schema: task_schema(),
        }
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let (name, task) = task_arguments(&self.validator, &arguments)?;
        Ok(CallToolResult::text(self.store.complete_task(name, task).await?))
    }
}

fn task_schema() -> Value {
    json_schema_object(
        serde_json::json!({
            "projectName": json_schema_string("Name of the project"),
            "task": json_schema_string("Task description")
        }),
        vec!["projectName", "task"],
    )
}

fn task_arguments(validator: &SecurityValidator, arguments: &Value) -> Result<(String, String)> {
    let name = required_str(arguments, "projectName")?;
    let task = required_str(arguments, "task")?;
    let name = validator.validate_project_name(&name)?;
    let task = validator.validate_text(&task, validator.config().max_task_length, "task")?;
    if task.is_empty() {
        return Err(CoordinatorError::InvalidArguments("task must not be empty".to_string()).into());
    }
    Ok((name, task))
}
