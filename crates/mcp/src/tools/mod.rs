pub mod analytics;
pub mod projects;
mod registry;

pub use analytics::{
    ActivityHeatMapTool, AddProjectTaskTool, CompleteProjectTaskTool, ProjectHealthTool,
    StatusTimelineTool, TechnologyTrendsTool,
};
pub use projects::{
    AddProjectTool, GetProjectStatusTool, ListProjectsTool, SearchCodePatternsTool,
    UpdateProjectStatusTool,
};
pub use registry::{
    json_schema_number, json_schema_object, json_schema_string, optional_i64, optional_str,
    required_str, Tool, ToolRegistry,
};

use coordinator_core::{ProjectStore, SecurityValidator};
use std::sync::Arc;

/// Build the tool catalog: the five project tools, then the analytics and
/// task tools when `extended` is set
pub fn build_registry(
    store: ProjectStore,
    validator: Arc<SecurityValidator>,
    extended: bool,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(ListProjectsTool::new(store.clone())));
    registry.register(Arc::new(GetProjectStatusTool::new(store.clone(), validator.clone())));
    registry.register(Arc::new(SearchCodePatternsTool::new(store.clone(), validator.clone())));
    registry.register(Arc::new(AddProjectTool::new(store.clone(), validator.clone())));
    registry.register(Arc::new(UpdateProjectStatusTool::new(store.clone(), validator.clone())));

    if extended {
        registry.register(Arc::new(StatusTimelineTool::new(store.clone(), validator.clone())));
        registry.register(Arc::new(ActivityHeatMapTool::new(store.clone())));
        registry.register(Arc::new(TechnologyTrendsTool::new(store.clone())));
        registry.register(Arc::new(ProjectHealthTool::new(store.clone(), validator.clone())));
        registry.register(Arc::new(AddProjectTaskTool::new(store.clone(), validator.clone())));
        registry.register(Arc::new(CompleteProjectTaskTool::new(store, validator)));
    }

    registry
}
