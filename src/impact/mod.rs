//! Change impact analysis
//!
//! Finds the methods that changed since a baseline revision and walks the
//! reverse call graph from them to the test methods that reach them.

mod analysis;
mod bfs;
mod diff;
mod format;
mod types;

pub use analysis::{baseline_revision, GitJavaAnalyzer};
pub use bfs::CallGraph;
pub use diff::changed_methods;
pub use format::{changed_listing, numbered_list, report_to_json, tests_listing};
pub use types::{ChangeKind, ChangeRecord, ImpactReport, TestMethod, TypeHierarchy};

/// Default bound on reverse call-graph traversal.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 5;

/// Computes the impact of the working changes at a given depth.
pub trait ImpactAnalyzer: Send {
    fn analyze(&self, depth: u32) -> anyhow::Result<ImpactReport>;
}
