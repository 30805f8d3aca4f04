// Configuration for the coordinator, loaded from TOML with defaults

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub security: SecurityConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Input validation limits and the directories projects may live in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub enable_validation: bool,
    pub allowed_paths: Vec<String>,
    pub max_project_name_length: usize,
    pub max_path_length: usize,
    pub max_description_length: usize,
    pub max_notes_length: usize,
    pub max_status_length: usize,
    pub max_task_length: usize,
    pub max_search_pattern_length: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Register analytics report and task tools next to the five core tools
    pub extended: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Home-relative development directories accepted by default
pub fn default_allowed_paths() -> Vec<String> {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    [
        "Developer",
        "Documents",
        "GitHub",
        "Projects",
        "Desktop/Development",
        "Xcode",
    ]
    .iter()
    .map(|dir| home.join(dir).to_string_lossy().into_owned())
    .collect()
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            allowed_paths: default_allowed_paths(),
            max_project_name_length: 100,
            max_path_length: 500,
            max_description_length: 2000,
            max_notes_length: 10000,
            max_status_length: 500,
            max_task_length: 500,
            max_search_pattern_length: 300,
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            security: SecurityConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Load configuration from `path`, falling back to defaults when the file is absent
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("Configuration file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        toml::from_str(&content).context("Failed to parse configuration file")
    }
}

/// Explicit context built once at startup and handed to every component
#[derive(Debug, Clone)]
pub struct CoordinatorContext {
    pub config: CoordinatorConfig,
    pub knowledge_base: PathBuf,
}

impl CoordinatorContext {
    pub fn new(config: CoordinatorConfig, knowledge_base: impl Into<PathBuf>) -> Self {
        Self {
            config,
            knowledge_base: knowledge_base.into(),
        }
    }

    /// Default configuration file inside the knowledge base
    pub fn default_config_path(knowledge_base: &Path) -> PathBuf {
        knowledge_base.join("coordinator.toml")
    }
}
