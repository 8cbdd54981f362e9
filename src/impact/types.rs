//! Data types for impact analysis

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// How a method differs between the baseline and the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// A method that changed between the baseline and the working tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub signature: String,
    pub class_qualified_name: String,
    pub method_name: String,
    pub parameter_types: Vec<String>,
    /// Repository-relative path
    pub file: String,
    pub kind: ChangeKind,
}

/// A selectable test method reached from at least one change.
#[derive(Debug, Clone, Serialize)]
pub struct TestMethod {
    pub signature: String,
    /// Qualified name of the declaring class; `None` for methods of
    /// anonymous classes, which cannot be selected
    pub class_name: Option<String>,
    pub method_name: String,
    pub parameter_types: Vec<String>,
    /// Qualified candidates for every annotation on the method
    pub annotations: Vec<String>,
    pub file: PathBuf,
    pub line: u32,
    /// Call distance from the nearest changed method (0 = changed itself)
    pub depth: usize,
}

/// Superclass links of project classes, keyed by qualified class name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TypeHierarchy {
    supers: BTreeMap<String, String>,
}

impl TypeHierarchy {
    pub fn insert(&mut self, class: impl Into<String>, superclass: impl Into<String>) {
        self.supers.insert(class.into(), superclass.into());
    }

    pub fn superclass_of(&self, class: &str) -> Option<&str> {
        self.supers.get(class).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.supers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supers.is_empty()
    }
}

/// Result of one impact computation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImpactReport {
    /// Revision the working tree was compared against
    pub baseline: String,
    pub changed: Vec<ChangeRecord>,
    pub tests: Vec<TestMethod>,
    pub hierarchy: TypeHierarchy,
    pub files_scanned: usize,
}

impl ImpactReport {
    /// True when there is nothing to run: no changes, or no test reaches one.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() || self.tests.is_empty()
    }
}
