// Markdown rendering for tool output and knowledge-base documents

use crate::time::format_date;
use crate::types::Project;
use chrono::{DateTime, Utc};
use std::fmt::Write;

pub const NO_PROJECTS: &str = "No projects currently tracked.\n\nTo add a project, use: add_project\nExample: add_project name:\"WeatherApp\" path:\"~/Developer/WeatherApp\" description:\"iOS weather application\"";

/// Literal reply for a search that matched nothing
pub fn no_results(pattern: &str) -> String {
    format!("No results found for pattern: {}", pattern)
}

/// `list_projects` report; `projects` must already be sorted by name
pub fn project_list<'a>(projects: impl IntoIterator<Item = &'a Project>) -> String {
    let mut out = String::from("# Tracked Projects\n\n");
    let mut any = false;

    for project in projects {
        any = true;
        let _ = writeln!(out, "## {}", project.name);
        let _ = writeln!(out, "- **Path**: {}", project.path);
        if let Some(description) = &project.description {
            let _ = writeln!(out, "- **Description**: {}", description);
        }
        if let Some(status) = &project.status {
            let _ = writeln!(out, "- **Status**: {}", status);
        }
        let _ = writeln!(out, "- **Tech Stack**: {}", project.tech_stack.join(", "));
        let _ = writeln!(out, "- **Last Modified**: {}", format_date(&project.last_modified));
        if !project.current_tasks.is_empty() {
            out.push_str("- **Current Tasks**:\n");
            for task in &project.current_tasks {
                let _ = writeln!(out, "  - {}", task);
            }
        }
        out.push('\n');
    }

    if !any {
        return NO_PROJECTS.to_string();
    }
    out
}

/// `get_project_status` report
pub fn project_status(project: &Project) -> String {
    let mut out = format!("# {} Status\n\n", project.name);
    let _ = write!(out, "**Path**: {}\n\n", project.path);

    if let Some(description) = &project.description {
        let _ = write!(out, "## Description\n{}\n\n", description);
    }
    if let Some(status) = &project.status {
        let _ = write!(out, "## Current Status\n{}\n\n", status);
    }

    out.push_str("## Tech Stack\n");
    for tech in &project.tech_stack {
        let _ = writeln!(out, "- {}", tech);
    }
    out.push('\n');

    if !project.current_tasks.is_empty() {
        out.push_str("## Current Tasks\n");
        for task in &project.current_tasks {
            let _ = writeln!(out, "- [ ] {}", task);
        }
        out.push('\n');
    }

    if let Some(notes) = &project.notes {
        let _ = write!(out, "## Notes\n{}\n\n", notes);
    }

    let _ = write!(out, "**Last Updated**: {}", format_date(&project.last_modified));
    out
}

/// Companion `<name>-summary.md` written next to each project document
pub fn project_summary(project: &Project) -> String {
    let mut out = format!("# {}\n\n", project.name);

    if let Some(description) = &project.description {
        let _ = write!(out, "{}\n\n", description);
    }

    let _ = write!(out, "## Location\n`{}`\n\n", project.path);

    out.push_str("## Tech Stack\n");
    for tech in &project.tech_stack {
        let _ = writeln!(out, "- {}", tech);
    }
    out.push('\n');

    if let Some(status) = &project.status {
        let _ = write!(out, "## Status\n{}\n\n", status);
    }

    if !project.current_tasks.is_empty() {
        out.push_str("## Current Tasks\n");
        for task in &project.current_tasks {
            let _ = writeln!(out, "- [ ] {}", task);
        }
        out.push('\n');
    }

    if let Some(notes) = &project.notes {
        let _ = writeln!(out, "## Notes\n{}", notes);
    }

    out
}

const INDEX_FOOTER: &str = "
## Reference Material
- Swift patterns: see patterns/swift-patterns.md
- Build issues: see tools/troubleshooting.md

## Quick Commands
- List all projects: `list_projects`
- Search patterns: `search_code_patterns [pattern]`
- Update status: `update_project_status [project] [status]`
";

/// Top-level `project-index.md`; `projects` must already be sorted by name
pub fn project_index<'a>(projects: impl IntoIterator<Item = &'a Project>, now: DateTime<Utc>) -> String {
    let mut out = format!(
        "# Project Coordinator Index\n\nLast Updated: {}\n\n## Active Projects\n\n",
        format_date(&now)
    );

    for project in projects {
        let _ = writeln!(out, "### {}", project.name);
        let _ = writeln!(out, "- **Location**: `{}`", project.path);
        let _ = writeln!(out, "- **Tech Stack**: {}", project.tech_stack.join(", "));
        if let Some(status) = &project.status {
            let _ = writeln!(out, "- **Status**: {}", status);
        }
        let _ = writeln!(out, "- **Last Modified**: {}", format_date(&project.last_modified));
        out.push('\n');
    }

    out.push_str(INDEX_FOOTER);
    out
}

/// Search hit list, or the literal no-results reply
pub fn search_results(pattern: &str, hits: &[String]) -> String {
    if hits.is_empty() {
        return no_results(pattern);
    }
    let lines: Vec<String> = hits.iter().map(|hit| format!("- {}", hit)).collect();
    format!("# Search Results for '{}'\n\n{}", pattern, lines.join("\n"))
}

/// Confirmation returned by `add_project`
pub fn project_added(project: &Project) -> String {
    format!(
        "Successfully added project: {name}\nPath: {path}\nDetected tech stack: {stack}\n\nYou can now:\n- Update status: update_project_status projectName:\"{name}\" status:\"your status\"\n- Add notes: update_project_status projectName:\"{name}\" notes:\"your notes\"",
        name = project.name,
        path = project.path,
        stack = project.tech_stack.join(", "),
    )
}

pub fn project_updated(name: &str) -> String {
    format!("Successfully updated {}", name)
}

pub fn task_added(name: &str, task: &str) -> String {
    format!("Added task to {}: {}", name, task)
}

pub fn task_completed(name: &str, task: &str) -> String {
    format!("Completed task in {}: {}", name, task)
}
