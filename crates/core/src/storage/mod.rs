pub mod knowledge_base;

pub use knowledge_base::FilesystemKnowledgeBase;

use crate::types::{Project, ProjectWithAnalytics, TechnologyStats};
use anyhow::Result;

/// A reference document from the pattern library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternDocument {
    pub file_name: String,
    pub content: String,
}

/// Persistence for project documents, analytics documents, and technology stats.
///
/// Every document is replaced as a whole; there are no partial updates.
#[async_trait::async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Create the directory layout and seed reference material
    async fn ensure_layout(&self) -> Result<()>;

    /// Load every readable project document; malformed ones are skipped
    async fn load_projects(&self) -> Result<Vec<Project>>;

    /// Load every readable analytics document; malformed ones are skipped
    async fn load_analytics(&self) -> Result<Vec<ProjectWithAnalytics>>;

    /// Load the global technology statistics, if present and readable
    async fn load_technology_stats(&self) -> Result<Option<TechnologyStats>>;

    /// Write the project document and regenerate its markdown summary
    async fn save_project(&self, project: &Project) -> Result<()>;

    async fn save_analytics(&self, record: &ProjectWithAnalytics) -> Result<()>;

    async fn save_technology_stats(&self, stats: &TechnologyStats) -> Result<()>;

    /// Regenerate the human-readable index; `projects` are sorted by name
    async fn write_index(&self, projects: &[Project]) -> Result<()>;

    /// Markdown documents of the pattern library, sorted by file name
    async fn pattern_documents(&self) -> Result<Vec<PatternDocument>>;
}
