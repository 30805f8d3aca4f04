use super::{KnowledgeStore, PatternDocument};
use crate::render;
use crate::time;
use crate::types::{Project, ProjectWithAnalytics, TechnologyStats};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

const PROJECTS_DIR: &str = "projects";
const ANALYTICS_DIR: &str = "analytics";
const PATTERNS_DIR: &str = "patterns";
const TOOLS_DIR: &str = "tools";
const TEMPLATES_DIR: &str = "templates";
const INDEX_FILE: &str = "project-index.md";
const TECH_STATS_FILE: &str = "global-tech-stats.json";
const PROJECT_ANALYTICS_DIR: &str = "analytics";

const SWIFT_PATTERNS: &str = r#"# Swift Code Patterns

## Async/Await Patterns

### Basic Async Function
```swift
func fetchData() async throws -> [DataModel] {
    let (data, _) = try await URLSession.shared.data(from: url)
    return try JSONDecoder().decode([DataModel].self, from: data)
}
```

### Task Groups
```swift
await withTaskGroup(of: Result<Data, Error>.self) { group in
    for url in urls {
        group.addTask { await self.fetchItem(from: url) }
    }
}
```

## Error Handling

### Custom Error Types
```swift
enum AppError: LocalizedError {
    case networkError(String)
    case decodingError
    case unauthorized
}
```
"#;

const TROUBLESHOOTING: &str = r#"# Xcode Troubleshooting Guide

## Common Build Errors

### "No such module" Error
1. Clean build folder (Shift+Cmd+K)
2. Delete derived data
3. Reopen the project

### Code Signing Issues
1. Check the Signing & Capabilities tab
2. Ensure the correct team is selected

## Performance Issues

### Slow Builds
- Build with a timing summary to find slow files
- Check for expensive type inference
- Consider modularizing large projects
"#;

/// Knowledge base stored as JSON and markdown files under one root directory.
///
/// Layout:
/// - `projects/<name>.json`, `projects/<name>-summary.md`
/// - `projects/analytics/<name>.json`
/// - `analytics/global-tech-stats.json`
/// - `patterns/`, `tools/`, `templates/` (reference text)
/// - `project-index.md`
#[derive(Debug, Clone)]
pub struct FilesystemKnowledgeBase {
    base_path: PathBuf,
}

impl FilesystemKnowledgeBase {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn projects_dir(&self) -> PathBuf {
        self.base_path.join(PROJECTS_DIR)
    }

    fn project_analytics_dir(&self) -> PathBuf {
        self.projects_dir().join(PROJECT_ANALYTICS_DIR)
    }

    /// Path of a per-project file in `dir`; the name becomes the file stem
    fn project_file(dir: PathBuf, name: &str, suffix: &str) -> Result<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\\') {
            anyhow::bail!("Project name '{}' cannot be used as a file name", name);
        }
        Ok(dir.join(format!("{}{}", name, suffix)))
    }

    fn tech_stats_path(&self) -> PathBuf {
        self.base_path.join(ANALYTICS_DIR).join(TECH_STATS_FILE)
    }

    /// Replace `path` atomically by writing a sibling and renaming it
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;
        Ok(())
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_vec_pretty(value).context("Failed to serialize document")?;
        self.write_atomic(path, &json).await
    }

    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let data = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse every JSON document directly inside `dir`, sorted by file name.
    ///
    /// A document is only kept when the name it carries is its file stem, so
    /// templates and stray copies never shadow a real project.
    async fn load_documents<T: DeserializeOwned>(dir: &Path, name: impl Fn(&T) -> &str) -> Result<Vec<T>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(dir)
            .await
            .with_context(|| format!("Failed to read {}", dir.display()))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to read entry of {}", dir.display()))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut documents = Vec::new();
        for file in files {
            match Self::read_json::<T>(&file).await {
                Ok(document) if file.file_stem().is_some_and(|stem| stem == name(&document)) => {
                    documents.push(document)
                }
                Ok(document) => tracing::warn!(
                    "Skipping {}: it holds project '{}'",
                    file.display(),
                    name(&document)
                ),
                Err(e) => tracing::warn!("Skipping document: {:#}", e),
            }
        }
        Ok(documents)
    }

    async fn seed(&self, path: PathBuf, contents: &str) -> Result<()> {
        if !path.exists() {
            self.write_atomic(&path, contents.as_bytes()).await?;
        }
        Ok(())
    }
}

fn project_name(project: &Project) -> &str {
    &project.name
}

#[async_trait::async_trait]
impl KnowledgeStore for FilesystemKnowledgeBase {
    async fn ensure_layout(&self) -> Result<()> {
        let project_analytics = Path::new(PROJECTS_DIR).join(PROJECT_ANALYTICS_DIR);
        let dirs = [
            Path::new(PROJECTS_DIR),
            project_analytics.as_path(),
            Path::new(ANALYTICS_DIR),
            Path::new(PATTERNS_DIR),
            Path::new(TOOLS_DIR),
            Path::new(TEMPLATES_DIR),
        ];
        for dir in dirs {
            let path = self.base_path.join(dir);
            tokio::fs::create_dir_all(&path)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
        }

        self.seed(self.base_path.join(PATTERNS_DIR).join("swift-patterns.md"), SWIFT_PATTERNS)
            .await?;
        self.seed(self.base_path.join(TOOLS_DIR).join("troubleshooting.md"), TROUBLESHOOTING)
            .await?;
        Ok(())
    }

    async fn load_projects(&self) -> Result<Vec<Project>> {
        Self::load_documents(&self.projects_dir(), project_name).await
    }

    async fn load_analytics(&self) -> Result<Vec<ProjectWithAnalytics>> {
        Self::load_documents(&self.project_analytics_dir(), ProjectWithAnalytics::name).await
    }

    async fn load_technology_stats(&self) -> Result<Option<TechnologyStats>> {
        let path = self.tech_stats_path();
        if !path.exists() {
            return Ok(None);
        }
        match Self::read_json::<TechnologyStats>(&path).await {
            Ok(stats) => Ok(Some(stats)),
            Err(e) => {
                tracing::warn!("Ignoring technology statistics: {:#}", e);
                Ok(None)
            }
        }
    }

    /// Writes the summary first; the project document itself is the last write
    async fn save_project(&self, project: &Project) -> Result<()> {
        let summary_path = Self::project_file(self.projects_dir(), &project.name, "-summary.md")?;
        self.write_atomic(&summary_path, render::project_summary(project).as_bytes())
            .await
            .with_context(|| format!("Failed to save summary for {}", project.name))?;

        let path = Self::project_file(self.projects_dir(), &project.name, ".json")?;
        self.write_json(&path, project)
            .await
            .with_context(|| format!("Failed to save project {}", project.name))
    }

    async fn save_analytics(&self, record: &ProjectWithAnalytics) -> Result<()> {
        let path = Self::project_file(self.project_analytics_dir(), record.name(), ".json")?;
        self.write_json(&path, record)
            .await
            .with_context(|| format!("Failed to save analytics for {}", record.name()))
    }

    async fn save_technology_stats(&self, stats: &TechnologyStats) -> Result<()> {
        self.write_json(&self.tech_stats_path(), stats)
            .await
            .context("Failed to save technology statistics")
    }

    async fn write_index(&self, projects: &[Project]) -> Result<()> {
        let index = render::project_index(projects, time::now());
        self.write_atomic(&self.base_path.join(INDEX_FILE), index.as_bytes())
            .await
            .context("Failed to write project index")
    }

    async fn pattern_documents(&self) -> Result<Vec<PatternDocument>> {
        let dir = self.base_path.join(PATTERNS_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .context("Failed to read patterns directory")?;
        let mut documents = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(".md") {
                continue;
            }
            match tokio::fs::read_to_string(entry.path()).await {
                Ok(content) => documents.push(PatternDocument { file_name, content }),
                Err(e) => tracing::warn!("Skipping pattern file {}: {}", file_name, e),
            }
        }
        documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(documents)
    }
}
