// Tech-stack detection for newly added projects

use crate::types::DEFAULT_TECHNOLOGY;
use crate::validation::expand_home;
use std::path::Path;
use walkdir::WalkDir;

pub const SWIFT_PACKAGE: &str = "Swift Package Manager";
pub const XCODE_PROJECT: &str = "Xcode Project";
pub const XCODE_WORKSPACE: &str = "Xcode Workspace";
pub const SWIFTUI: &str = "SwiftUI";

const SWIFTUI_MARKER: &str = "import SwiftUI";

/// Inspect a project directory and return its technology tags.
///
/// Looks for a `Package.swift` manifest, `.xcodeproj` / `.xcworkspace` bundles
/// at the top level, and an `import SwiftUI` line in any Swift source below the
/// root. A directory that matches nothing (or does not exist) gets the single
/// default tag.
pub fn detect_tech_stack(path: &str) -> Vec<String> {
    let root = expand_home(path);
    let mut stack = Vec::new();

    if root.join("Package.swift").is_file() {
        stack.push(SWIFT_PACKAGE.to_string());
    }

    if let Ok(entries) = std::fs::read_dir(&root) {
        let mut names: Vec<_> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        names.sort();
        for entry in names {
            match entry.extension().and_then(|e| e.to_str()) {
                Some("xcodeproj") => push_unique(&mut stack, XCODE_PROJECT),
                Some("xcworkspace") => push_unique(&mut stack, XCODE_WORKSPACE),
                _ => {}
            }
        }
    }

    if uses_swiftui(&root) {
        stack.push(SWIFTUI.to_string());
    }

    if stack.is_empty() {
        stack.push(DEFAULT_TECHNOLOGY.to_string());
    }
    stack
}

fn push_unique(stack: &mut Vec<String>, tag: &str) {
    if !stack.iter().any(|t| t == tag) {
        stack.push(tag.to_string());
    }
}

fn uses_swiftui(root: &Path) -> bool {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("swift"))
        .any(|e| {
            std::fs::read_to_string(e.path())
                .map(|content| content.contains(SWIFTUI_MARKER))
                .unwrap_or(false)
        })
}
