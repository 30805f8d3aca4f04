use crate::time::{self, iso8601};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status assigned to every newly added project
pub const DEFAULT_STATUS: &str = "Active";

/// Tag used when tech-stack detection finds nothing
pub const DEFAULT_TECHNOLOGY: &str = "Swift";

/// A tracked project as stored in its canonical document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub name: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(with = "iso8601")]
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub current_tasks: Vec<String>,
}

impl Project {
    /// Create a freshly added project with the default status
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        description: Option<String>,
        tech_stack: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            description,
            status: Some(DEFAULT_STATUS.to_string()),
            notes: None,
            tech_stack,
            last_modified: time::now(),
            current_tasks: Vec::new(),
        }
    }
}

/// One period spent in a given status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub status: String,
    #[serde(with = "iso8601")]
    pub start_date: DateTime<Utc>,
    #[serde(default, with = "iso8601::option", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl StatusEntry {
    pub fn open(status: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            status: status.into(),
            start_date,
            end_date: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.end_date.is_none()
    }

    /// Seconds spent in this status; open entries run until `now`. Never negative.
    pub fn duration_secs(&self, now: DateTime<Utc>) -> i64 {
        let end = self.end_date.unwrap_or(now);
        (end - self.start_date).num_seconds().max(0)
    }
}

/// Kind of activity recorded against a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    StatusChange,
    NoteAdded,
    TaskAdded,
    TaskCompleted,
    Accessed,
    Searched,
}

impl ActivityKind {
    /// Points contributed to an activity score
    pub fn weight(self) -> u32 {
        match self {
            ActivityKind::StatusChange => 5,
            ActivityKind::NoteAdded => 3,
            ActivityKind::TaskCompleted => 4,
            ActivityKind::TaskAdded => 2,
            ActivityKind::Accessed => 1,
            ActivityKind::Searched => 1,
        }
    }
}

/// An entry in a project's append-only activity log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(with = "iso8601")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ActivityEvent {
    pub fn new(kind: ActivityKind, description: Option<String>) -> Self {
        Self {
            timestamp: time::now(),
            kind,
            description,
        }
    }
}

/// A project plus the history the analytics engine derives reports from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectWithAnalytics {
    #[serde(flatten)]
    pub project: Project,
    #[serde(default)]
    pub status_history: Vec<StatusEntry>,
    #[serde(default)]
    pub activity_log: Vec<ActivityEvent>,
    #[serde(with = "iso8601")]
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub completed_tasks: Vec<String>,
}

impl ProjectWithAnalytics {
    /// Analytics record for a project created just now
    pub fn new(project: Project) -> Self {
        let created = time::now();
        let status_history = project
            .status
            .as_ref()
            .map(|s| vec![StatusEntry::open(s.clone(), created)])
            .unwrap_or_default();
        Self {
            project,
            status_history,
            activity_log: Vec::new(),
            created_date: created,
            completed_tasks: Vec::new(),
        }
    }

    /// Analytics record for a project that predates analytics tracking.
    ///
    /// The creation date and the first status period start at the project's
    /// last modification, not at the moment of migration.
    pub fn migrate(project: Project) -> Self {
        let since = project.last_modified;
        let status_history = project
            .status
            .as_ref()
            .map(|s| vec![StatusEntry::open(s.clone(), since)])
            .unwrap_or_default();
        Self {
            project,
            status_history,
            activity_log: Vec::new(),
            created_date: since,
            completed_tasks: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.project.name
    }

    /// The open status entry, if any. Only the last entry may be open.
    pub fn current_status_entry(&self) -> Option<&StatusEntry> {
        self.status_history.last().filter(|e| e.is_open())
    }

    pub fn total_tasks(&self) -> usize {
        self.project.current_tasks.len() + self.completed_tasks.len()
    }
}

/// Usage statistics for every technology tag across the portfolio
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyStats {
    #[serde(default)]
    pub framework_counts: BTreeMap<String, usize>,
    #[serde(default, with = "iso8601::map")]
    pub last_used: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    pub projects_using: BTreeMap<String, Vec<String>>,
}

impl TechnologyStats {
    /// Fold one (technology, project) pair into the statistics.
    ///
    /// Recording the same pair twice does not change the count.
    pub fn record(&mut self, technology: &str, project: &str, at: DateTime<Utc>) {
        let projects = self
            .projects_using
            .entry(technology.to_string())
            .or_default();
        if !projects.iter().any(|p| p == project) {
            projects.push(project.to_string());
        }
        self.framework_counts
            .insert(technology.to_string(), projects.len());
        self.last_used.insert(technology.to_string(), at);
    }

    /// Recompute counts from the project lists.
    ///
    /// Older documents incremented counts on every update; this repairs them.
    pub fn normalize(&mut self) {
        for projects in self.projects_using.values_mut() {
            let mut seen = std::collections::BTreeSet::new();
            projects.retain(|p| seen.insert(p.clone()));
        }
        self.framework_counts = self
            .projects_using
            .iter()
            .map(|(tech, projects)| (tech.clone(), projects.len()))
            .collect();
    }

    pub fn count(&self, technology: &str) -> usize {
        self.framework_counts.get(technology).copied().unwrap_or(0)
    }

    /// `floor(100 * count / total)`, or 0 when there are no projects
    pub fn usage_percentage(&self, technology: &str, total_projects: usize) -> usize {
        if total_projects == 0 {
            return 0;
        }
        self.count(technology) * 100 / total_projects
    }
}

/// Factors that make up a project's health score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthFactorKind {
    Activity,
    Staleness,
    Documentation,
    Completion,
}

impl HealthFactorKind {
    pub fn label(self) -> &'static str {
        match self {
            HealthFactorKind::Activity => "Activity Level",
            HealthFactorKind::Staleness => "Freshness",
            HealthFactorKind::Documentation => "Documentation Quality",
            HealthFactorKind::Completion => "Task Completion",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthFactor {
    pub kind: HealthFactorKind,
    /// 0-100
    pub score: u32,
    pub description: String,
}

/// Computed on demand, never persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectHealth {
    /// 0-100, the floor of the average of the factor scores
    pub score: u32,
    pub factors: Vec<HealthFactor>,
    pub recommendations: Vec<String>,
}

impl ProjectHealth {
    pub fn factor(&self, kind: HealthFactorKind) -> Option<&HealthFactor> {
        self.factors.iter().find(|f| f.kind == kind)
    }
}
