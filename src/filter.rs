//! Test method eligibility, module scoping and selection bounds

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::SessionError;
use crate::impact::{TestMethod, TypeHierarchy};
use crate::session::{RunSession, TestPattern};

/// JUnit 5 and JUnit 4 test markers.
pub const DEFAULT_TEST_MARKERS: &[&str] = &["org.junit.jupiter.api.Test", "org.junit.Test"];

/// Base classes whose subclasses are integration tests and never selected.
pub const DEFAULT_EXCLUDED_BASES: &[&str] =
    &["org.springframework.test.context.junit4.AbstractJUnit4SpringContextTests"];

/// Default cap on the number of tests handed to the test engine.
pub const DEFAULT_MAX_TESTS: usize = 100;

/// Superclass chains longer than this are treated as malformed.
const MAX_HIERARCHY_DEPTH: usize = 64;

/// A named group of source roots (a Maven/Gradle module).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    /// Absolute content roots
    pub roots: Vec<PathBuf>,
}

impl Module {
    /// True when `file` lies under one of the module's roots.
    pub fn contains(&self, file: &Path) -> bool {
        self.roots.iter().any(|root| file.starts_with(root))
    }
}

/// Modules known to the project.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<Module>,
}

impl ModuleRegistry {
    pub fn new(modules: Vec<Module>) -> Self {
        Self { modules }
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.modules.iter().map(|m| m.name.as_str())
    }
}

/// Decides which impacted methods become test patterns.
#[derive(Debug, Clone)]
pub struct TestMethodFilter {
    markers: Vec<String>,
    excluded_bases: Vec<String>,
}

impl Default for TestMethodFilter {
    fn default() -> Self {
        Self::new(
            DEFAULT_TEST_MARKERS.iter().map(|s| s.to_string()).collect(),
            DEFAULT_EXCLUDED_BASES.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl TestMethodFilter {
    pub fn new(markers: Vec<String>, excluded_bases: Vec<String>) -> Self {
        Self {
            markers,
            excluded_bases,
        }
    }

    /// True when any of the resolved annotation names is a test marker.
    pub fn is_test_annotated<S: AsRef<str>>(&self, annotations: &[S]) -> bool {
        annotations
            .iter()
            .any(|a| self.markers.iter().any(|m| m == a.as_ref()))
    }

    pub fn is_test_method(&self, method: &TestMethod) -> bool {
        self.is_test_annotated(&method.annotations)
    }

    /// True when `class` names an excluded base class or extends one.
    ///
    /// The superclass walk stops at the first class with no known
    /// superclass, or after a fixed number of steps on malformed data.
    pub fn is_excluded(&self, class: &str, hierarchy: &TypeHierarchy) -> bool {
        let by_name = self.excluded_bases.iter().any(|base| {
            let simple = base.rsplit('.').next().unwrap_or(base);
            class.contains(simple)
        });
        if by_name {
            return true;
        }

        let mut current = class;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            let Some(parent) = hierarchy.superclass_of(current) else {
                return false;
            };
            if self.excluded_bases.iter().any(|b| b == parent) {
                return true;
            }
            current = parent;
        }
        tracing::warn!(class, "Superclass chain too deep, assuming not excluded");
        false
    }

    /// Keep only methods whose file lies under the named module's roots.
    pub fn select_module_scoped(
        &self,
        methods: Vec<TestMethod>,
        module: &str,
        registry: &ModuleRegistry,
    ) -> Result<Vec<TestMethod>, SessionError> {
        let Some(found) = registry.get(module) else {
            return Err(SessionError::ModuleNotFound(module.to_string()));
        };
        let before = methods.len();
        let kept: Vec<TestMethod> = methods
            .into_iter()
            .filter(|m| found.contains(&m.file))
            .collect();
        tracing::debug!(module, before, after = kept.len(), "Module scoping applied");
        Ok(kept)
    }

    /// Collect `Class,method` patterns into the session, once.
    ///
    /// Skips non-test methods, methods without a named class and excluded
    /// classes. Does nothing if the session already holds patterns. Returns
    /// the number of patterns added.
    pub fn collect_patterns(
        &self,
        methods: &[TestMethod],
        hierarchy: &TypeHierarchy,
        session: &RunSession,
    ) -> usize {
        session.populate_once(|| {
            methods
                .iter()
                .filter(|m| self.is_test_method(m))
                .filter_map(|m| {
                    let class = m.class_name.as_deref().filter(|c| !c.is_empty())?;
                    if self.is_excluded(class, hierarchy) {
                        tracing::debug!(class, method = %m.method_name, "Excluded test class");
                        return None;
                    }
                    Some(TestPattern::new(class, m.method_name.clone()))
                })
                .collect()
        })
    }
}

/// At most `max` methods, deduplicated by signature and taken in signature
/// order so the same input always yields the same subset.
pub fn bounded_subset(methods: &[TestMethod], max: usize) -> Vec<TestMethod> {
    let mut seen = HashSet::new();
    let mut unique: Vec<&TestMethod> = methods
        .iter()
        .filter(|m| seen.insert(m.signature.as_str()))
        .collect();
    unique.sort_by(|a, b| a.signature.cmp(&b.signature));
    if unique.len() > max {
        tracing::info!(total = unique.len(), max, "Capping test selection");
    }
    unique.into_iter().take(max).cloned().collect()
}
