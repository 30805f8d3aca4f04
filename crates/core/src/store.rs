// Project store: a single worker task owning every project and its analytics

use crate::analytics::{AnalyticsEngine, HEAT_MAP_DAYS};
use crate::detect::detect_tech_stack;
use crate::error::{CoordinatorError, Result};
use crate::render;
use crate::storage::KnowledgeStore;
use crate::time::now;
use crate::types::{ActivityKind, Project, ProjectWithAnalytics, DEFAULT_TECHNOLOGY};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 64;

type Reply = oneshot::Sender<Result<String>>;

#[derive(Debug)]
enum Command {
    List(Reply),
    GetStatus {
        name: String,
        reply: Reply,
    },
    Add {
        name: String,
        path: String,
        description: Option<String>,
        reply: Reply,
    },
    UpdateStatus {
        name: String,
        status: Option<String>,
        notes: Option<String>,
        reply: Reply,
    },
    Search {
        pattern: String,
        reply: Reply,
    },
    AddTask {
        name: String,
        task: String,
        reply: Reply,
    },
    CompleteTask {
        name: String,
        task: String,
        reply: Reply,
    },
    StatusTimeline {
        name: String,
        reply: Reply,
    },
    HeatMap {
        days: i64,
        reply: Reply,
    },
    TechnologyTrends(Reply),
    HealthReport(Reply),
    ProjectHealth {
        name: String,
        reply: Reply,
    },
}

/// Handle to the project store worker.
///
/// Every operation is a message to one task that owns the project map and the
/// analytics engine, so operations run one at a time in arrival order and each
/// caller sees a consistent snapshot. Handles are cheap to clone.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    tx: mpsc::Sender<Command>,
}

impl ProjectStore {
    /// Hydrate from `storage` and start the worker task
    pub async fn spawn(storage: Arc<dyn KnowledgeStore>) -> Self {
        let worker = StoreWorker::initialize(storage).await;
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| CoordinatorError::StoreUnavailable)?;
        rx.await.map_err(|_| CoordinatorError::StoreUnavailable)?
    }

    /// Every project, ordered by name
    pub async fn list(&self) -> Result<String> {
        self.request(Command::List).await
    }

    pub async fn get_status(&self, name: impl Into<String>) -> Result<String> {
        let name = name.into();
        self.request(|reply| Command::GetStatus { name, reply }).await
    }

    /// Track a new project. Names already tracked are rejected.
    pub async fn add(
        &self,
        name: impl Into<String>,
        path: impl Into<String>,
        description: Option<String>,
    ) -> Result<String> {
        let (name, path) = (name.into(), path.into());
        self.request(|reply| Command::Add {
            name,
            path,
            description,
            reply,
        })
        .await
    }

    /// Partial update; fields left as `None` keep their value
    pub async fn update_status(
        &self,
        name: impl Into<String>,
        status: Option<String>,
        notes: Option<String>,
    ) -> Result<String> {
        let name = name.into();
        self.request(|reply| Command::UpdateStatus {
            name,
            status,
            notes,
            reply,
        })
        .await
    }

    /// Case-insensitive search over the pattern library, project notes, and technology tags
    pub async fn search(&self, pattern: impl Into<String>) -> Result<String> {
        let pattern = pattern.into();
        self.request(|reply| Command::Search { pattern, reply }).await
    }

    pub async fn add_task(&self, name: impl Into<String>, task: impl Into<String>) -> Result<String> {
        let (name, task) = (name.into(), task.into());
        self.request(|reply| Command::AddTask { name, task, reply }).await
    }

    pub async fn complete_task(&self, name: impl Into<String>, task: impl Into<String>) -> Result<String> {
        let (name, task) = (name.into(), task.into());
        self.request(|reply| Command::CompleteTask { name, task, reply })
            .await
    }

    pub async fn status_timeline(&self, name: impl Into<String>) -> Result<String> {
        let name = name.into();
        self.request(|reply| Command::StatusTimeline { name, reply })
            .await
    }

    /// Activity ranking over the last `days` days (7 when `None`)
    pub async fn heat_map(&self, days: Option<i64>) -> Result<String> {
        let days = days.unwrap_or(HEAT_MAP_DAYS);
        self.request(|reply| Command::HeatMap { days, reply }).await
    }

    pub async fn technology_trends(&self) -> Result<String> {
        self.request(Command::TechnologyTrends).await
    }

    pub async fn health_report(&self) -> Result<String> {
        self.request(Command::HealthReport).await
    }

    pub async fn project_health(&self, name: impl Into<String>) -> Result<String> {
        let name = name.into();
        self.request(|reply| Command::ProjectHealth { name, reply })
            .await
    }
}

struct StoreWorker {
    projects: BTreeMap<String, Project>,
    analytics: AnalyticsEngine,
    storage: Arc<dyn KnowledgeStore>,
}

impl StoreWorker {
    /// Load every document; failures are logged and the affected state starts empty
    async fn initialize(storage: Arc<dyn KnowledgeStore>) -> Self {
        if let Err(e) = storage.ensure_layout().await {
            warn!("Failed to prepare knowledge base layout: {:#}", e);
        }

        let loaded = storage.load_projects().await.unwrap_or_else(|e| {
            warn!("Failed to load projects: {:#}", e);
            Vec::new()
        });
        let stats = storage
            .load_technology_stats()
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load technology stats: {:#}", e);
                None
            })
            .unwrap_or_default();
        let mut records: HashMap<String, ProjectWithAnalytics> = storage
            .load_analytics()
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to load analytics: {:#}", e);
                Vec::new()
            })
            .into_iter()
            .map(|record| (record.project.name.clone(), record))
            .collect();

        let mut analytics = AnalyticsEngine::with_technology_stats(stats);
        let mut projects = BTreeMap::new();
        let mut migrated = Vec::new();
        for project in loaded {
            if !analytics.restore(&project, records.remove(&project.name)) {
                migrated.push(project.name.clone());
            }
            projects.insert(project.name.clone(), project);
        }

        let worker = Self {
            projects,
            analytics,
            storage,
        };

        for name in &migrated {
            info!("Migrated project {} to analytics tracking", name);
            worker.save_record_quietly(name).await;
        }
        if !migrated.is_empty() {
            worker.save_stats_quietly().await;
        }
        worker.write_index().await;

        info!("Project store ready with {} projects", worker.projects.len());
        worker
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            debug!("Project store command: {:?}", command);
            self.handle(command).await;
        }
        debug!("Project store stopped");
    }

    async fn handle(&mut self, command: Command) {
        // A dropped receiver means the caller gave up; there is nobody to tell.
        match command {
            Command::List(reply) => {
                let _ = reply.send(Ok(render::project_list(self.projects.values())));
            }
            Command::GetStatus { name, reply } => {
                let _ = reply.send(self.get_status(&name).await);
            }
            Command::Add {
                name,
                path,
                description,
                reply,
            } => {
                let _ = reply.send(self.add(name, path, description).await);
            }
            Command::UpdateStatus {
                name,
                status,
                notes,
                reply,
            } => {
                let _ = reply.send(self.update_status(&name, status, notes).await);
            }
            Command::Search { pattern, reply } => {
                let _ = reply.send(Ok(self.search(&pattern).await));
            }
            Command::AddTask { name, task, reply } => {
                let _ = reply.send(self.add_task(&name, task).await);
            }
            Command::CompleteTask { name, task, reply } => {
                let _ = reply.send(self.complete_task(&name, &task).await);
            }
            Command::StatusTimeline { name, reply } => {
                let result = self
                    .analytics
                    .status_timeline(&name, now())
                    .ok_or(CoordinatorError::ProjectNotFound(name));
                let _ = reply.send(result);
            }
            Command::HeatMap { days, reply } => {
                let _ = reply.send(Ok(self.analytics.activity_heat_map(days, now())));
            }
            Command::TechnologyTrends(reply) => {
                let _ = reply.send(Ok(self.analytics.technology_trends()));
            }
            Command::HealthReport(reply) => {
                let _ = reply.send(Ok(self.analytics.health_report(now())));
            }
            Command::ProjectHealth { name, reply } => {
                let result = self
                    .analytics
                    .health_details(&name, now())
                    .ok_or(CoordinatorError::ProjectNotFound(name));
                let _ = reply.send(result);
            }
        }
    }

    fn project(&self, name: &str) -> Result<&Project> {
        self.projects
            .get(name)
            .ok_or_else(|| CoordinatorError::ProjectNotFound(name.to_string()))
    }

    async fn get_status(&mut self, name: &str) -> Result<String> {
        let mut report = render::project_status(self.project(name)?);
        if let Some(timeline) = self.analytics.status_timeline(name, now()) {
            report.push_str("\n\n");
            report.push_str(&timeline);
        }

        self.analytics.record_activity(name, ActivityKind::Accessed, None);
        self.save_record_quietly(name).await;
        Ok(report)
    }

    async fn add(&mut self, name: String, path: String, description: Option<String>) -> Result<String> {
        if self.projects.contains_key(&name) {
            return Err(CoordinatorError::ProjectExists(name));
        }

        let detect_path = path.clone();
        let tech_stack = tokio::task::spawn_blocking(move || detect_tech_stack(&detect_path))
            .await
            .unwrap_or_else(|e| {
                warn!("Tech stack detection failed: {}", e);
                vec![DEFAULT_TECHNOLOGY.to_string()]
            });

        let project = Project::new(name, path, description, tech_stack);
        let record = ProjectWithAnalytics::new(project.clone());
        self.apply(project.clone(), |analytics| analytics.update_project(record))
            .await?;

        info!("Added project {} at {}", project.name, project.path);
        Ok(render::project_added(&project))
    }

    async fn update_status(
        &mut self,
        name: &str,
        status: Option<String>,
        notes: Option<String>,
    ) -> Result<String> {
        let mut project = self.project(name)?.clone();
        let previous = project.status.clone();
        if let Some(status) = &status {
            project.status = Some(status.clone());
        }
        if let Some(notes) = &notes {
            project.notes = Some(notes.clone());
        }
        project.last_modified = now();

        let changed = status.filter(|s| previous.as_deref() != Some(s.as_str()));
        let synced = project.clone();
        self.apply(project, |analytics| {
            analytics.sync_project(&synced);
            if let Some(status) = changed {
                analytics.update_status(name, &status);
            }
            if notes.is_some() {
                analytics.record_activity(name, ActivityKind::NoteAdded, None);
            }
        })
        .await?;

        Ok(render::project_updated(name))
    }

    async fn search(&mut self, pattern: &str) -> String {
        let needle = pattern.to_lowercase();
        let mut hits = Vec::new();

        match self.storage.pattern_documents().await {
            Ok(documents) => {
                for document in documents {
                    if document.content.to_lowercase().contains(&needle) {
                        hits.push(format!("Found in patterns/{}", document.file_name));
                    }
                }
            }
            Err(e) => warn!("Failed to read pattern library: {:#}", e),
        }

        let mut matched = Vec::new();
        for project in self.projects.values() {
            let before = hits.len();
            if project
                .notes
                .as_deref()
                .is_some_and(|notes| notes.to_lowercase().contains(&needle))
            {
                hits.push(format!("Found in project {} notes", project.name));
            }
            for tech in &project.tech_stack {
                if tech.to_lowercase().contains(&needle) {
                    hits.push(format!("{} uses {}", project.name, tech));
                }
            }
            if hits.len() > before {
                matched.push(project.name.clone());
            }
        }

        for name in &matched {
            self.analytics
                .record_activity(name, ActivityKind::Searched, Some(pattern.to_string()));
            self.save_record_quietly(name).await;
        }

        render::search_results(pattern, &hits)
    }

    async fn add_task(&mut self, name: &str, task: String) -> Result<String> {
        let mut project = self.project(name)?.clone();
        if project.current_tasks.contains(&task) {
            return Err(CoordinatorError::InvalidArguments(format!(
                "task '{}' is already open in {}",
                task, name
            )));
        }
        project.current_tasks.push(task.clone());
        project.last_modified = now();

        let synced = project.clone();
        self.apply(project, |analytics| {
            analytics.sync_project(&synced);
            analytics.add_task(name, &task);
        })
        .await?;

        Ok(render::task_added(name, &task))
    }

    async fn complete_task(&mut self, name: &str, task: &str) -> Result<String> {
        let mut project = self.project(name)?.clone();
        let Some(index) = project.current_tasks.iter().position(|t| t == task) else {
            return Err(CoordinatorError::InvalidArguments(format!(
                "task '{}' is not an open task of {}",
                task, name
            )));
        };
        project.current_tasks.remove(index);
        project.last_modified = now();

        let synced = project.clone();
        self.apply(project, |analytics| {
            analytics.sync_project(&synced);
            analytics.complete_task(name, task);
        })
        .await?;

        Ok(render::task_completed(name, task))
    }

    /// Stage an analytics change for `project`, write every document, then make it live.
    ///
    /// The project document is written last. If any write fails the engine is
    /// rolled back, its previous documents are rewritten, and the project map
    /// is left untouched.
    async fn apply(&mut self, project: Project, change: impl FnOnce(&mut AnalyticsEngine)) -> Result<()> {
        let checkpoint = self.analytics.checkpoint(&project.name);
        change(&mut self.analytics);

        if let Err(e) = self.persist(&project).await {
            self.analytics.rollback(checkpoint);
            self.save_record_quietly(&project.name).await;
            self.save_stats_quietly().await;
            return Err(e);
        }

        self.projects.insert(project.name.clone(), project);
        self.write_index().await;
        Ok(())
    }

    async fn persist(&self, project: &Project) -> Result<()> {
        if let Some(record) = self.analytics.get(&project.name) {
            self.storage
                .save_analytics(record)
                .await
                .map_err(CoordinatorError::storage)?;
        }
        self.storage
            .save_technology_stats(self.analytics.technology_stats())
            .await
            .map_err(CoordinatorError::storage)?;
        self.storage
            .save_project(project)
            .await
            .map_err(CoordinatorError::storage)
    }

    async fn write_index(&self) {
        let projects: Vec<Project> = self.projects.values().cloned().collect();
        if let Err(e) = self.storage.write_index(&projects).await {
            warn!("Failed to write project index: {:#}", e);
        }
    }

    /// Persist a record after a read-only operation logged activity against it
    async fn save_record_quietly(&self, name: &str) {
        if let Some(record) = self.analytics.get(name) {
            if let Err(e) = self.storage.save_analytics(record).await {
                warn!("Failed to save analytics for {}: {:#}", name, e);
            }
        }
    }

    async fn save_stats_quietly(&self) {
        if let Err(e) = self.storage.save_technology_stats(self.analytics.technology_stats()).await {
            warn!("Failed to save technology stats: {:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FilesystemKnowledgeBase, PatternDocument};
    use crate::types::TechnologyStats;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    async fn store_in(dir: &TempDir) -> (ProjectStore, Arc<FilesystemKnowledgeBase>) {
        let kb = Arc::new(FilesystemKnowledgeBase::new(dir.path().join("kb")));
        let store = ProjectStore::spawn(kb.clone()).await;
        (store, kb)
    }

    fn project_dir(dir: &TempDir, name: &str) -> String {
        let path = dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_empty_store_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        assert_eq!(store.list().await.unwrap(), render::NO_PROJECTS);
    }

    #[tokio::test]
    async fn test_add_then_get_status() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");

        let added = store.add("Foo", path.clone(), None).await.unwrap();
        assert!(added.starts_with("Successfully added project: Foo"));
        assert!(added.contains("Detected tech stack: Swift"));

        let status = store.get_status("Foo").await.unwrap();
        assert!(status.contains(&format!("**Path**: {}", path)));
        assert!(status.contains("## Current Status\nActive"));
        assert!(status.contains("## Tech Stack\n- Swift\n"));
        assert!(status.contains("## Status Timeline for Foo"));
    }

    #[tokio::test]
    async fn test_list_is_alphabetical() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        for name in ["Zeta", "Foo", "Alpha"] {
            let path = project_dir(&temp_dir, name);
            store.add(name, path, None).await.unwrap();
        }

        let list = store.list().await.unwrap();
        let positions: Vec<usize> = ["## Alpha", "## Foo", "## Zeta"]
            .iter()
            .map(|h| list.find(h).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");
        store.add("Foo", path.clone(), Some("first".to_string())).await.unwrap();

        let err = store.add("Foo", path, Some("second".to_string())).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::ProjectExists(ref n) if n == "Foo"));
        assert!(store.get_status("Foo").await.unwrap().contains("first"));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        let err = store.get_status("Ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "Project not found: Ghost");
        let err = store.update_status("Ghost", Some("Done".into()), None).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::ProjectNotFound(_)));
    }

    #[tokio::test]
    async fn test_status_changes_close_previous_entry() {
        let temp_dir = TempDir::new().unwrap();
        let (store, kb) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");
        store.add("Foo", path, None).await.unwrap();

        store.update_status("Foo", Some("Paused".into()), None).await.unwrap();
        store.update_status("Foo", Some("Shipped".into()), None).await.unwrap();
        // Same status again is not a transition
        store.update_status("Foo", Some("Shipped".into()), None).await.unwrap();

        let records = kb.load_analytics().await.unwrap();
        let record = records.iter().find(|r| r.project.name == "Foo").unwrap();
        assert_eq!(record.status_history.len(), 3);
        let open: Vec<_> = record.status_history.iter().filter(|e| e.is_open()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].status, "Shipped");
        assert!(record.status_history[1].end_date.is_some());
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");
        store.add("Foo", path, None).await.unwrap();

        let reply = store
            .update_status("Foo", None, Some("Uses async/await".into()))
            .await
            .unwrap();
        assert_eq!(reply, "Successfully updated Foo");

        let status = store.get_status("Foo").await.unwrap();
        assert!(status.contains("## Current Status\nActive"));
        assert!(status.contains("## Notes\nUses async/await"));
    }

    #[tokio::test]
    async fn test_search_hits_and_misses() {
        let temp_dir = TempDir::new().unwrap();
        let (store, kb) = store_in(&temp_dir).await;
        for name in ["Beta", "Alpha"] {
            let path = project_dir(&temp_dir, name);
            store.add(name, path, None).await.unwrap();
        }
        store
            .update_status("Beta", None, Some("Relies on SWIFT concurrency".into()))
            .await
            .unwrap();

        let result = store.search("swift").await.unwrap();
        let alpha = result.find("- Alpha uses Swift").unwrap();
        let beta_notes = result.find("- Found in project Beta notes").unwrap();
        let beta_tag = result.find("- Beta uses Swift").unwrap();
        assert!(alpha < beta_notes && beta_notes < beta_tag);
        assert!(result.contains("- Found in patterns/swift-patterns.md"));

        assert_eq!(
            store.search("kubernetes").await.unwrap(),
            "No results found for pattern: kubernetes"
        );

        let records = kb.load_analytics().await.unwrap();
        let alpha = records.iter().find(|r| r.project.name == "Alpha").unwrap();
        assert_eq!(alpha.activity_log.last().unwrap().kind, ActivityKind::Searched);
    }

    #[tokio::test]
    async fn test_restart_reproduces_state() {
        let temp_dir = TempDir::new().unwrap();
        let path = project_dir(&temp_dir, "Foo");
        let before = {
            let (store, _) = store_in(&temp_dir).await;
            store.add("Foo", path, Some("demo".into())).await.unwrap();
            store.update_status("Foo", Some("Paused".into()), Some("n".into())).await.unwrap();
            store.add_task("Foo", "write docs").await.unwrap();
            store.list().await.unwrap()
        };

        let (store, kb) = store_in(&temp_dir).await;
        assert_eq!(store.list().await.unwrap(), before);

        let projects = kb.load_projects().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].current_tasks, vec!["write docs"]);
        assert_eq!(projects[0].status.as_deref(), Some("Paused"));
    }

    #[tokio::test]
    async fn test_restart_keeps_projects_with_reserved_looking_names() {
        let temp_dir = TempDir::new().unwrap();
        let names = ["Foo-analytics", "Foo", "EXAMPLE"];
        let before = {
            let (store, _) = store_in(&temp_dir).await;
            for name in names {
                let path = project_dir(&temp_dir, name);
                store.add(name, path, Some(format!("{} description", name))).await.unwrap();
            }
            store.update_status("Foo", Some("Paused".into()), None).await.unwrap();
            store.list().await.unwrap()
        };

        let (store, kb) = store_in(&temp_dir).await;
        assert_eq!(store.list().await.unwrap(), before);
        for name in names {
            let status = store.get_status(name).await.unwrap();
            assert!(status.contains(&format!("## Description\n{} description", name)));
        }
        let records = kb.load_analytics().await.unwrap();
        assert_eq!(records.len(), 3);
        let foo = records.iter().find(|r| r.project.name == "Foo").unwrap();
        assert_eq!(foo.status_history.len(), 2);
    }

    #[tokio::test]
    async fn test_legacy_project_is_migrated() {
        let temp_dir = TempDir::new().unwrap();
        let kb = Arc::new(FilesystemKnowledgeBase::new(temp_dir.path().join("kb")));
        kb.ensure_layout().await.unwrap();
        let mut legacy = Project::new("Old", "/tmp/old", None, vec!["Swift".into()]);
        legacy.last_modified = legacy.last_modified - chrono::Duration::days(3);
        kb.save_project(&legacy).await.unwrap();

        let _store = ProjectStore::spawn(kb.clone()).await;
        let records = kb.load_analytics().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].created_date, legacy.last_modified);
    }

    #[tokio::test]
    async fn test_tasks_move_between_lists() {
        let temp_dir = TempDir::new().unwrap();
        let (store, kb) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");
        store.add("Foo", path, None).await.unwrap();

        assert_eq!(
            store.add_task("Foo", "ship").await.unwrap(),
            "Added task to Foo: ship"
        );
        assert!(store.add_task("Foo", "ship").await.is_err());
        assert_eq!(
            store.complete_task("Foo", "ship").await.unwrap(),
            "Completed task in Foo: ship"
        );
        let err = store.complete_task("Foo", "ship").await.unwrap_err();
        assert!(matches!(err, CoordinatorError::InvalidArguments(_)));

        let records = kb.load_analytics().await.unwrap();
        assert!(records[0].project.current_tasks.is_empty());
        assert_eq!(records[0].completed_tasks, vec!["ship"]);
    }

    #[tokio::test]
    async fn test_reports() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _) = store_in(&temp_dir).await;
        let path = project_dir(&temp_dir, "Foo");
        store.add("Foo", path, None).await.unwrap();

        assert!(store.heat_map(None).await.unwrap().contains("(Past 7 Days)"));
        assert!(store.technology_trends().await.unwrap().contains("- **Swift**: 100% of projects (1/1)"));
        assert!(store.health_report().await.unwrap().contains("Foo"));
        assert!(store.project_health("Foo").await.unwrap().starts_with("#### Foo (Health: "));
        assert!(store.status_timeline("Ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_stopped_worker_is_unavailable() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let store = ProjectStore { tx };
        assert!(matches!(store.list().await, Err(CoordinatorError::StoreUnavailable)));
    }

    #[test]
    fn test_commands_debug_as_their_variant() {
        let (reply, _rx) = oneshot::channel();
        let command = Command::AddTask {
            name: "Foo".to_string(),
            task: "ship".to_string(),
            reply,
        };
        let printed = format!("{:?}", command);
        assert!(printed.starts_with("AddTask"));
        assert!(printed.contains("\"ship\""));
    }

    /// Store whose writes always fail
    struct ReadOnlyStore;

    #[async_trait::async_trait]
    impl KnowledgeStore for ReadOnlyStore {
        async fn ensure_layout(&self) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        async fn load_projects(&self) -> anyhow::Result<Vec<Project>> {
            Ok(Vec::new())
        }
        async fn load_analytics(&self) -> anyhow::Result<Vec<ProjectWithAnalytics>> {
            Ok(Vec::new())
        }
        async fn load_technology_stats(&self) -> anyhow::Result<Option<TechnologyStats>> {
            Ok(None)
        }
        async fn save_project(&self, _: &Project) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        async fn save_analytics(&self, _: &ProjectWithAnalytics) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        async fn save_technology_stats(&self, _: &TechnologyStats) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        async fn write_index(&self, _: &[Project]) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
        async fn pattern_documents(&self) -> anyhow::Result<Vec<PatternDocument>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_save_failure_surfaces_and_leaves_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = ProjectStore::spawn(Arc::new(ReadOnlyStore)).await;
        let path = project_dir(&temp_dir, "Foo");

        let err = store.add("Foo", path, None).await.unwrap_err();
        assert_eq!(err.to_string(), "File system error: read-only file system");
        assert_eq!(store.list().await.unwrap(), render::NO_PROJECTS);
        // The worker survives the failure
        assert!(store.search("x").await.unwrap().starts_with("No results"));
    }

    /// Filesystem store whose analytics writes fail while `failing` is set
    struct FailingAnalytics {
        inner: FilesystemKnowledgeBase,
        failing: AtomicBool,
    }

    #[async_trait::async_trait]
    impl KnowledgeStore for FailingAnalytics {
        async fn ensure_layout(&self) -> anyhow::Result<()> {
            self.inner.ensure_layout().await
        }
        async fn load_projects(&self) -> anyhow::Result<Vec<Project>> {
            self.inner.load_projects().await
        }
        async fn load_analytics(&self) -> anyhow::Result<Vec<ProjectWithAnalytics>> {
            self.inner.load_analytics().await
        }
        async fn load_technology_stats(&self) -> anyhow::Result<Option<TechnologyStats>> {
            self.inner.load_technology_stats().await
        }
        async fn save_project(&self, project: &Project) -> anyhow::Result<()> {
            self.inner.save_project(project).await
        }
        async fn save_analytics(&self, record: &ProjectWithAnalytics) -> anyhow::Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.save_analytics(record).await
        }
        async fn save_technology_stats(&self, stats: &TechnologyStats) -> anyhow::Result<()> {
            self.inner.save_technology_stats(stats).await
        }
        async fn write_index(&self, projects: &[Project]) -> anyhow::Result<()> {
            self.inner.write_index(projects).await
        }
        async fn pattern_documents(&self) -> anyhow::Result<Vec<PatternDocument>> {
            self.inner.pattern_documents().await
        }
    }

    #[tokio::test]
    async fn test_failed_analytics_write_leaves_previous_state() {
        let temp_dir = TempDir::new().unwrap();
        let kb = Arc::new(FailingAnalytics {
            inner: FilesystemKnowledgeBase::new(temp_dir.path().join("kb")),
            failing: AtomicBool::new(true),
        });
        let store = ProjectStore::spawn(kb.clone()).await;
        let path = project_dir(&temp_dir, "Foo");

        let err = store.add("Foo", path.clone(), None).await.unwrap_err();
        assert_eq!(err.to_string(), "File system error: disk full");
        assert_eq!(store.list().await.unwrap(), render::NO_PROJECTS);
        assert!(kb.load_projects().await.unwrap().is_empty());
        assert_eq!(store.technology_trends().await.unwrap(), AnalyticsEngine::new().technology_trends());

        // A retry is a fresh add, not a duplicate
        kb.failing.store(false, Ordering::SeqCst);
        store.add("Foo", path, None).await.unwrap();

        kb.failing.store(true, Ordering::SeqCst);
        assert!(store.update_status("Foo", Some("Paused".into()), None).await.is_err());
        assert!(store.add_task("Foo", "ship").await.is_err());
        kb.failing.store(false, Ordering::SeqCst);

        let status = store.get_status("Foo").await.unwrap();
        assert!(status.contains("## Current Status\nActive"));
        assert!(!status.contains("ship"));
        let timeline = store.status_timeline("Foo").await.unwrap();
        assert!(!timeline.contains("Paused"));

        let projects = kb.load_projects().await.unwrap();
        assert_eq!(projects[0].status.as_deref(), Some("Active"));
        assert!(projects[0].current_tasks.is_empty());
        let records = kb.load_analytics().await.unwrap();
        assert_eq!(records[0].status_history.len(), 1);
        store.add_task("Foo", "ship").await.unwrap();
    }
}
