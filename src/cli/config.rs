//! Configuration and project root detection
//!
//! Provides project root detection and CLI overrides of config values.

use std::path::{Path, PathBuf};

use affected::config::Config;

/// Find project root by looking for common markers.
///
/// Walks up from `start`. Build files win over the VCS root, so the nearest
/// Maven or Gradle project is used even inside a larger repository.
pub(crate) fn find_project_root(start: &Path) -> PathBuf {
    let mut current = start;

    loop {
        // Listed in priority order: if multiple exist, first match wins
        let markers = [
            "pom.xml",          // Maven
            "build.gradle",     // Gradle (Groovy)
            "build.gradle.kts", // Gradle (Kotlin)
            "settings.gradle",  // Gradle multi-project
            ".git",             // Git repository root (fallback)
        ];

        if markers.iter().any(|m| current.join(m).exists()) {
            return current.to_path_buf();
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => break,
        }
    }

    tracing::warn!("No project root found, using current directory");
    start.to_path_buf()
}

/// CLI flags that override config values.
#[derive(Debug, Default)]
pub(crate) struct Overrides {
    pub module: Option<String>,
    pub max_tests: Option<usize>,
    pub max_call_depth: Option<usize>,
}

/// Apply CLI flags on top of file config. Flags always win.
pub(crate) fn apply_overrides(config: &mut Config, overrides: Overrides) {
    if overrides.module.is_some() {
        config.target_module = overrides.module;
    }
    if overrides.max_tests.is_some() {
        config.max_tests = overrides.max_tests;
    }
    if overrides.max_call_depth.is_some() {
        config.max_call_depth = overrides.max_call_depth;
    }
}
