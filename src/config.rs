//! Configuration file support for affected
//!
//! Config files are loaded in order (later overrides earlier):
//! 1. `~/.config/affected/config.toml` (user defaults)
//! 2. `.affected.toml` in project root (project overrides)
//!
//! CLI flags override all config file values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::filter::{
    Module, ModuleRegistry, TestMethodFilter, DEFAULT_EXCLUDED_BASES, DEFAULT_MAX_TESTS,
    DEFAULT_TEST_MARKERS,
};
use crate::impact::DEFAULT_MAX_CALL_DEPTH;
use crate::runner::{LaunchSpec, PatternStyle, DEFAULT_JVM_OPTIONS, DEFAULT_OPTIONS_ENV};

/// Project config file name, looked up in the project root.
pub const PROJECT_CONFIG_FILE: &str = ".affected.toml";

/// A module and its content roots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    /// Content roots relative to the project root. Empty means the directory
    /// named after the module.
    #[serde(default)]
    pub roots: Vec<PathBuf>,
}

/// Test command template.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Executable, e.g. `mvn` or `./gradlew`
    pub program: Option<String>,
    /// Arguments; `{tests}` and `{module}` are substituted
    pub args: Option<Vec<String>>,
    /// Extra arguments appended for single-module runs
    pub module_args: Option<Vec<String>>,
    pub pattern_style: Option<PatternStyle>,
    /// JVM options for the test process. An empty string disables them.
    pub options: Option<String>,
    /// Environment variable the options are exported in
    pub options_env: Option<String>,
}

impl RunnerConfig {
    fn override_with(self, other: Self) -> Self {
        RunnerConfig {
            program: other.program.or(self.program),
            args: other.args.or(self.args),
            module_args: other.module_args.or(self.module_args),
            pattern_style: other.pattern_style.or(self.pattern_style),
            options: other.options.or(self.options),
            options_env: other.options_env.or(self.options_env),
        }
    }
}

/// Configuration options loaded from config files
///
/// # Example
///
/// ```toml
/// # ~/.config/affected/config.toml or .affected.toml
/// target_module = "core"   # Run tests of one module only
/// max_tests = 100          # Cap on selected tests per run
/// max_call_depth = 5       # Reverse call-graph search depth
/// verbose = false          # Enable verbose logging
///
/// [[modules]]
/// name = "core"
/// roots = ["core/src/test/java"]
///
/// [runner]
/// program = "mvn"
/// pattern_style = "maven"
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Module whose tests are run (whole project when unset)
    pub target_module: Option<String>,
    /// Maximum tests per run (overridden by --max-tests)
    pub max_tests: Option<usize>,
    /// Reverse call-graph depth (overridden by --max-call-depth)
    pub max_call_depth: Option<usize>,
    /// Qualified names of test-marker annotations
    pub test_annotations: Option<Vec<String>>,
    /// Qualified names of base classes whose subclasses are never run
    pub excluded_base_classes: Option<Vec<String>>,
    /// Enable verbose mode by default
    pub verbose: Option<bool>,
    /// Module registry
    pub modules: Vec<ModuleConfig>,
    pub runner: RunnerConfig,
}

impl Config {
    /// Load configuration from user and project config files
    pub fn load(project_root: &Path) -> Self {
        let user_config = dirs::config_dir()
            .map(|d| d.join("affected/config.toml"))
            .and_then(|p| Self::load_file(&p))
            .unwrap_or_default();

        let project_config =
            Self::load_file(&project_root.join(PROJECT_CONFIG_FILE)).unwrap_or_default();

        // Project overrides user
        let merged = user_config.override_with(project_config);
        tracing::debug!(
            target_module = ?merged.target_module,
            max_tests = ?merged.max_tests,
            max_call_depth = ?merged.max_call_depth,
            verbose = ?merged.verbose,
            modules = merged.modules.len(),
            "Effective config after merge"
        );
        merged
    }

    /// Load configuration from a specific file
    fn load_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };

        match toml::from_str::<Self>(&content) {
            Ok(config) => {
                tracing::debug!(
                    path = %path.display(),
                    target_module = ?config.target_module,
                    modules = config.modules.len(),
                    "Loaded config"
                );
                Some(config)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Layer another config on top (other overrides self where present)
    fn override_with(self, other: Self) -> Self {
        // Project modules replace user modules by name, new ones are appended
        let mut modules = self.modules;
        for proj in other.modules {
            if let Some(pos) = modules.iter().position(|m| m.name == proj.name) {
                modules[pos] = proj;
            } else {
                modules.push(proj);
            }
        }

        Config {
            target_module: other.target_module.or(self.target_module),
            max_tests: other.max_tests.or(self.max_tests),
            max_call_depth: other.max_call_depth.or(self.max_call_depth),
            test_annotations: other.test_annotations.or(self.test_annotations),
            excluded_base_classes: other.excluded_base_classes.or(self.excluded_base_classes),
            verbose: other.verbose.or(self.verbose),
            modules,
            runner: self.runner.override_with(other.runner),
        }
    }

    // ===== Accessors with defaults =====

    pub fn max_tests_or_default(&self) -> usize {
        self.max_tests.unwrap_or(DEFAULT_MAX_TESTS)
    }

    pub fn max_call_depth_or_default(&self) -> usize {
        self.max_call_depth.unwrap_or(DEFAULT_MAX_CALL_DEPTH)
    }

    pub fn verbose_or_default(&self) -> bool {
        self.verbose.unwrap_or(false)
    }

    pub fn test_annotations_or_default(&self) -> Vec<String> {
        self.test_annotations
            .clone()
            .unwrap_or_else(|| DEFAULT_TEST_MARKERS.iter().map(|s| s.to_string()).collect())
    }

    pub fn excluded_base_classes_or_default(&self) -> Vec<String> {
        self.excluded_base_classes
            .clone()
            .unwrap_or_else(|| DEFAULT_EXCLUDED_BASES.iter().map(|s| s.to_string()).collect())
    }

    /// Test filter built from the annotation and exclusion settings.
    pub fn test_filter(&self) -> TestMethodFilter {
        TestMethodFilter::new(
            self.test_annotations_or_default(),
            self.excluded_base_classes_or_default(),
        )
    }

    /// Module registry with roots resolved against `project_root`.
    pub fn module_registry(&self, project_root: &Path) -> ModuleRegistry {
        ModuleRegistry::new(
            self.modules
                .iter()
                .map(|m| {
                    let roots = if m.roots.is_empty() {
                        vec![project_root.join(&m.name)]
                    } else {
                        m.roots.iter().map(|r| project_root.join(r)).collect()
                    };
                    Module {
                        name: m.name.clone(),
                        roots,
                    }
                })
                .collect(),
        )
    }

    /// JVM options for test runs; `None` when disabled with an empty string.
    pub fn jvm_options(&self) -> Option<String> {
        match self.runner.options.as_deref() {
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(s.to_string()),
            None => Some(DEFAULT_JVM_OPTIONS.join(" ")),
        }
    }

    /// Test command, filling unset fields from the pattern style's defaults.
    pub fn launch_spec(&self) -> LaunchSpec {
        let style = self.runner.pattern_style.unwrap_or_default();
        let defaults = LaunchSpec::defaults_for(style);
        LaunchSpec {
            program: self.runner.program.clone().unwrap_or(defaults.program),
            args: self.runner.args.clone().unwrap_or(defaults.args),
            module_args: self
                .runner
                .module_args
                .clone()
                .unwrap_or(defaults.module_args),
            style,
            options_env: self
                .runner
                .options_env
                .clone()
                .unwrap_or_else(|| DEFAULT_OPTIONS_ENV.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&config_path, "max_tests = 10\ntarget_module = \"core\"\n").unwrap();

        let config = Config::load_file(&config_path).unwrap();
        assert_eq!(config.max_tests, Some(10));
        assert_eq!(config.target_module.as_deref(), Some("core"));
        assert_eq!(config.max_tests_or_default(), 10);
        assert_eq!(config.max_call_depth_or_default(), DEFAULT_MAX_CALL_DEPTH);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_file(&dir.path().join("nonexistent.toml"));
        assert!(config.is_none());
    }

    #[test]
    fn test_load_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(&config_path, "not valid [[[").unwrap();

        let config = Config::load_file(&config_path);
        assert!(config.is_none());
    }

    #[test]
    fn test_merge_override() {
        let base = Config {
            max_tests: Some(10),
            max_call_depth: Some(3),
            runner: RunnerConfig {
                program: Some("mvn".into()),
                options: Some("-ea".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let override_cfg = Config {
            max_tests: Some(20),
            target_module: Some("web".into()),
            runner: RunnerConfig {
                program: Some("./mvnw".into()),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.override_with(override_cfg);
        assert_eq!(merged.max_tests, Some(20));
        assert_eq!(merged.max_call_depth, Some(3));
        assert_eq!(merged.target_module.as_deref(), Some("web"));
        assert_eq!(merged.runner.program.as_deref(), Some("./mvnw"));
        assert_eq!(merged.runner.options.as_deref(), Some("-ea"));
    }

    #[test]
    fn test_parse_modules_and_runner() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(PROJECT_CONFIG_FILE);
        std::fs::write(
            &config_path,
            r#"
target_module = "core"

[[modules]]
name = "core"
roots = ["core/src/test/java", "core/src/it/java"]

[[modules]]
name = "web"

[runner]
program = "./gradlew"
pattern_style = "gradle"
options = ""
"#,
        )
        .unwrap();

        let config = Config::load_file(&config_path).unwrap();
        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules[0].roots.len(), 2);
        assert!(config.modules[1].roots.is_empty());
        assert_eq!(config.runner.pattern_style, Some(PatternStyle::Gradle));
        assert_eq!(config.jvm_options(), None);

        let registry = config.module_registry(Path::new("/p"));
        let core = registry.get("core").unwrap();
        assert!(core.contains(Path::new("/p/core/src/test/java/a/T.java")));
        let web = registry.get("web").unwrap();
        assert_eq!(web.roots, vec![PathBuf::from("/p/web")]);

        let spec = config.launch_spec();
        assert_eq!(spec.program, "./gradlew");
        assert_eq!(spec.style, PatternStyle::Gradle);
        assert_eq!(spec.options_env, DEFAULT_OPTIONS_ENV);
    }

    #[test]
    fn test_merge_modules_replace_by_name() {
        let user = Config {
            modules: vec![
                ModuleConfig {
                    name: "core".into(),
                    roots: vec!["old".into()],
                },
                ModuleConfig {
                    name: "web".into(),
                    roots: vec![],
                },
            ],
            ..Default::default()
        };
        let project = Config {
            modules: vec![
                ModuleConfig {
                    name: "core".into(),
                    roots: vec!["new".into()],
                },
                ModuleConfig {
                    name: "batch".into(),
                    roots: vec![],
                },
            ],
            ..Default::default()
        };

        let merged = user.override_with(project);
        let names: Vec<_> = merged.modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["core", "web", "batch"]);
        assert_eq!(merged.modules[0].roots, vec![PathBuf::from("new")]);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.max_tests_or_default(), 100);
        assert!(!config.verbose_or_default());
        assert_eq!(
            config.test_annotations_or_default(),
            vec!["org.junit.jupiter.api.Test", "org.junit.Test"]
        );
        let opts = config.jvm_options().unwrap();
        assert!(opts.starts_with("-ea --add-opens java.base/java.io=ALL-UNNAMED"));
        assert_eq!(config.launch_spec().style, PatternStyle::Maven);
    }
}
