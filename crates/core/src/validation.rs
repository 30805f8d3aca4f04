// Input validation applied to tool arguments before they reach the project store

use crate::config::SecurityConfig;
use std::path::{Component, Path, PathBuf};

/// A rejected input, with a message explaining the rule that was violated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Project path cannot be empty")]
    EmptyPath,

    #[error("Project path exceeds maximum allowed length of {0} characters")]
    PathTooLong(usize),

    #[error("Path traversal attempt detected. Paths cannot contain '..' or similar patterns")]
    PathTraversal,

    #[error(
        "Path '{path}' is outside allowed directories.\n\nAllowed directories:\n{}\n\nTo allow another directory, add it to security.allowed_paths in the configuration file.",
        bullet_list(.allowed)
    )]
    PathNotAllowed { path: String, allowed: Vec<String> },

    #[error("The specified path does not exist: {0}")]
    PathDoesNotExist(String),

    #[error("The specified path is not a directory: {0}")]
    PathNotDirectory(String),

    #[error("Cannot read the specified directory: {0}")]
    PathNotReadable(String),

    #[error("Project name cannot be empty")]
    EmptyProjectName,

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} contains invalid characters. Only {allowed} are allowed")]
    InvalidCharacters { field: String, allowed: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Search pattern cannot be empty")]
    EmptySearchPattern,

    #[error("Security violation: Search pattern contains potentially dangerous content: {0}")]
    PotentialInjection(String),
}

type Result<T> = std::result::Result<T, ValidationError>;

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  • {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

const TRAVERSAL_MARKERS: [&str; 6] = ["../", "..\\", "/..", "\\..", "..%2F", "..%5C"];

const SCRIPT_MARKERS: [&str; 5] = ["<script", "</script>", "javascript:", "data:text/html", "vbscript:"];

const INJECTION_MARKERS: [&str; 17] = [
    "$(", "`", "eval(", "exec(", "system(", "rm -", "del ", "format(", "$(IFS)", "${IFS}", "$IFS",
    "&&", "||", ";", "|", ">", "<",
];

const NAME_PUNCTUATION: &str = "-_.()[]";

/// Checks names, paths, free text, and search patterns.
///
/// When validation is disabled in the configuration every check passes its
/// input through unchanged.
#[derive(Debug, Clone)]
pub struct SecurityValidator {
    config: SecurityConfig,
}

impl SecurityValidator {
    pub fn new(config: SecurityConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enable_validation
    }

    pub fn config(&self) -> &SecurityConfig {
        &self.config
    }

    /// Validate a project name and return it trimmed
    pub fn validate_project_name(&self, name: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(name.to_string());
        }

        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyProjectName);
        }
        if name.chars().count() > self.config.max_project_name_length {
            return Err(ValidationError::TooLong {
                field: "Project name".to_string(),
                max: self.config.max_project_name_length,
            });
        }

        let allowed = |c: char| c.is_alphanumeric() || c.is_whitespace() || NAME_PUNCTUATION.contains(c);
        if !name.chars().all(allowed) {
            return Err(ValidationError::InvalidCharacters {
                field: "Project name".to_string(),
                allowed: "letters, numbers, spaces, hyphens, underscores, parentheses, and brackets"
                    .to_string(),
            });
        }

        if name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(ValidationError::InvalidFormat(
                "Project name cannot contain path separators or parent directory references"
                    .to_string(),
            ));
        }

        Ok(trimmed.to_string())
    }

    /// Validate a project path and return it expanded and normalised
    pub fn validate_project_path(&self, path: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(path.to_string());
        }

        if path.is_empty() {
            return Err(ValidationError::EmptyPath);
        }
        if path.chars().count() > self.config.max_path_length {
            return Err(ValidationError::PathTooLong(self.config.max_path_length));
        }

        let normalized = normalize_path(&expand_home(path));
        let normalized_str = normalized.to_string_lossy().into_owned();

        for marker in TRAVERSAL_MARKERS {
            if path.contains(marker) || normalized_str.contains(marker) {
                return Err(ValidationError::PathTraversal);
            }
        }

        let is_allowed = self
            .config
            .allowed_paths
            .iter()
            .any(|base| normalized.starts_with(normalize_path(&expand_home(base))));
        if !is_allowed {
            return Err(ValidationError::PathNotAllowed {
                path: normalized_str,
                allowed: self.config.allowed_paths.clone(),
            });
        }

        Ok(normalized_str)
    }

    /// Validate free text, stripping script markers and control characters
    pub fn validate_text(&self, text: &str, max_length: usize, field: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(text.to_string());
        }

        if text.chars().count() > max_length {
            return Err(ValidationError::TooLong {
                field: field.to_string(),
                max: max_length,
            });
        }

        let mut sanitized = text.to_string();
        for marker in SCRIPT_MARKERS {
            sanitized = remove_ignore_ascii_case(&sanitized, marker);
        }
        sanitized.retain(|c| {
            let value = c as u32;
            let is_control = (value < 32 && c != '\t' && c != '\n' && c != '\r') || value == 127;
            !is_control
        });

        Ok(sanitized.trim().to_string())
    }

    /// Validate a search pattern and return it trimmed
    pub fn validate_search_pattern(&self, pattern: &str) -> Result<String> {
        if !self.is_enabled() {
            return Ok(pattern.to_string());
        }

        if pattern.trim().is_empty() {
            return Err(ValidationError::EmptySearchPattern);
        }
        if pattern.chars().count() > self.config.max_search_pattern_length {
            return Err(ValidationError::TooLong {
                field: "Search pattern".to_string(),
                max: self.config.max_search_pattern_length,
            });
        }

        if let Some(marker) = INJECTION_MARKERS.iter().find(|m| pattern.contains(*m)) {
            return Err(ValidationError::PotentialInjection(marker.to_string()));
        }

        Ok(pattern.trim().to_string())
    }

    /// Check that `path` exists, is a directory, and can be listed
    pub fn verify_path_exists(&self, path: &str) -> Result<()> {
        if !self.is_enabled() {
            return Ok(());
        }

        let path_buf = PathBuf::from(path);
        let metadata = std::fs::metadata(&path_buf)
            .map_err(|_| ValidationError::PathDoesNotExist(path.to_string()))?;
        if !metadata.is_dir() {
            return Err(ValidationError::PathNotDirectory(path.to_string()));
        }
        std::fs::read_dir(&path_buf).map_err(|_| ValidationError::PathNotReadable(path.to_string()))?;
        Ok(())
    }
}

/// Replace a leading `~` with the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest.trim_start_matches('/'));
        }
    }
    PathBuf::from(path)
}

/// Resolve `.` and `..` components without touching the filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn remove_ignore_ascii_case(haystack: &str, needle: &str) -> String {
    let lower = haystack.to_ascii_lowercase();
    let needle = needle.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find(&needle) {
        let start = cursor + found;
        out.push_str(&haystack[cursor..start]);
        cursor = start + needle.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}
