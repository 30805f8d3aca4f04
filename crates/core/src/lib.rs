// Core types and functionality for the project coordinator

pub mod analytics;
pub mod config;
pub mod detect;
pub mod error;
pub mod render;
pub mod storage;
pub mod store;
pub mod time;
pub mod types;
pub mod validation;

pub use analytics::AnalyticsEngine;
pub use config::{CoordinatorConfig, CoordinatorContext, SecurityConfig, ToolsConfig};
pub use error::{CoordinatorError, Result};
pub use storage::{FilesystemKnowledgeBase, KnowledgeStore};
pub use store::ProjectStore;
pub use types::*;
pub use validation::{SecurityValidator, ValidationError};
