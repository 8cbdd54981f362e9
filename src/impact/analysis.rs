//! Git + tree-sitter impact analyzer

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::diff_parse::{changed_files, parse_unified_diff};
use crate::filter::TestMethodFilter;
use crate::parser::{JavaFile, Parser};
use crate::signature;
use crate::vcs::GitCli;

use super::bfs::{reverse_bfs_multi, CallGraph};
use super::diff::changed_methods;
use super::types::{ChangeKind, ChangeRecord, ImpactReport, TestMethod, TypeHierarchy};
use super::{ImpactAnalyzer, DEFAULT_MAX_CALL_DEPTH};

/// Revision compared against for a change-tracking depth.
///
/// Depth 1 is the uncommitted work against `HEAD`; each further step pulls in
/// one more commit.
pub fn baseline_revision(depth: u32) -> String {
    match depth {
        0 | 1 => "HEAD".to_string(),
        d => format!("HEAD~{}", d - 1),
    }
}

/// Computes impact from `git diff` and a call graph of the project's Java
/// sources.
pub struct GitJavaAnalyzer {
    git: GitCli,
    parser: Parser,
    filter: TestMethodFilter,
    max_call_depth: usize,
}

impl GitJavaAnalyzer {
    pub fn new(root: impl Into<PathBuf>, filter: TestMethodFilter) -> Result<Self> {
        Ok(Self {
            git: GitCli::new(root),
            parser: Parser::new().context("Failed to initialize Java parser")?,
            filter,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        })
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    fn root(&self) -> &Path {
        self.git.root()
    }

    /// Method changes in tracked files since `baseline`, plus every method
    /// of untracked Java files.
    fn collect_changes(&self, baseline: &str) -> Result<Vec<ChangeRecord>> {
        let diff = self
            .git
            .run(&["diff", "--no-color", "--no-ext-diff", baseline, "--", "*.java"])
            .with_context(|| format!("Failed to diff against {baseline}"))?;
        let hunks = parse_unified_diff(&diff);

        let untracked = self
            .git
            .run(&["ls-files", "--others", "--exclude-standard", "--", "*.java"])
            .context("Failed to list untracked files")?;

        let mut files: Vec<&str> = changed_files(&hunks).into_iter().collect();
        files.extend(untracked.lines().map(str::trim).filter(|l| !l.is_empty()));
        files.sort_unstable();
        files.dedup();
        tracing::debug!(files = files.len(), "Changed Java files");

        let mut changes = Vec::new();
        for file in files {
            let old = match self.git.show_file(baseline, file) {
                Ok(Some(text)) => Some(self.parser.parse_source(&text, Path::new(file))?),
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(file, error = %e, "Could not read baseline version");
                    None
                }
            };
            let abs = self.root().join(file);
            let new = if abs.exists() {
                Some(
                    self.parser
                        .parse_file(&abs)
                        .with_context(|| format!("Failed to parse {}", abs.display()))?,
                )
            } else {
                None
            };
            changes.extend(changed_methods(file, old.as_ref(), new.as_ref()));
        }
        Ok(changes)
    }

    /// Parse every Java file under the root, honoring `.gitignore`.
    fn index_project(&self) -> Vec<JavaFile> {
        let _span = tracing::info_span!("index_project").entered();
        let files: Vec<PathBuf> = ignore::WalkBuilder::new(self.root())
            .hidden(true)
            .git_ignore(true)
            .build()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(err) => {
                    tracing::debug!(error = %err, "Skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_some_and(|t| t.is_file()))
            .map(|e| e.into_path())
            .filter(|p| p.extension().is_some_and(|ext| ext == "java"))
            .collect();

        files
            .par_iter()
            .filter_map(|path| match self.parser.parse_file(path) {
                Ok(f) => Some(f),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to parse file");
                    None
                }
            })
            .collect()
    }
}

impl ImpactAnalyzer for GitJavaAnalyzer {
    fn analyze(&self, depth: u32) -> Result<ImpactReport> {
        let _span = tracing::info_span!("analyze_impact", depth).entered();
        let baseline = baseline_revision(depth);

        let changed = self.collect_changes(&baseline)?;
        if changed.is_empty() {
            tracing::info!(baseline, "No method changes");
            return Ok(ImpactReport {
                baseline,
                ..Default::default()
            });
        }

        let index = self.index_project();
        let hierarchy = build_hierarchy(&index);
        let graph = build_call_graph(&index, &changed);
        tracing::debug!(
            files = index.len(),
            edges = graph.edge_count(),
            "Call graph built"
        );

        let targets: Vec<&str> = changed.iter().map(|c| c.signature.as_str()).collect();
        let reached = reverse_bfs_multi(&graph, &targets, self.max_call_depth);

        let mut tests = Vec::new();
        for file in &index {
            for method in file.methods.iter().filter(|m| m.class_name.is_some()) {
                let signature = method.signature();
                let Some(&depth) = reached.get(&signature) else {
                    continue;
                };
                let annotations: Vec<String> = method
                    .annotations
                    .iter()
                    .flat_map(|a| file.resolve(a))
                    .collect();
                if !self.filter.is_test_annotated(&annotations) {
                    continue;
                }
                tests.push(TestMethod {
                    signature,
                    class_name: method.class_name.clone(),
                    method_name: method.name.clone(),
                    parameter_types: method.parameter_types.clone(),
                    annotations,
                    file: file.path.clone(),
                    line: method.line_start,
                    depth,
                });
            }
        }
        tests.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.signature.cmp(&b.signature)));

        tracing::info!(
            changed = changed.len(),
            tests = tests.len(),
            "Impact computed"
        );
        Ok(ImpactReport {
            baseline,
            changed,
            tests,
            hierarchy,
            files_scanned: index.len(),
        })
    }
}

/// Superclass of every project class, resolved to a qualified name.
///
/// A candidate naming a project class wins; otherwise the first import-based
/// candidate is used, since a same-package class would be in the index.
fn build_hierarchy(index: &[JavaFile]) -> TypeHierarchy {
    let known: HashSet<&str> = index
        .iter()
        .flat_map(|f| f.classes.iter().map(|c| c.qualified_name.as_str()))
        .collect();

    let mut hierarchy = TypeHierarchy::default();
    for file in index {
        for class in &file.classes {
            let Some(raw) = &class.superclass else {
                continue;
            };
            let candidates = file.resolve(raw);
            let chosen = candidates
                .iter()
                .find(|c| known.contains(c.as_str()))
                .or_else(|| candidates.get(1))
                .or_else(|| candidates.first());
            if let Some(parent) = chosen {
                hierarchy.insert(class.qualified_name.clone(), parent.clone());
            }
        }
    }
    hierarchy
}

/// Link every call site to each declaration with the same name and argument
/// count. Removed methods are declarations too, so their former callers are
/// still found.
fn build_call_graph(index: &[JavaFile], changed: &[ChangeRecord]) -> CallGraph {
    let mut exact: HashMap<(&str, usize), Vec<String>> = HashMap::new();
    let mut varargs: HashMap<&str, Vec<(usize, String)>> = HashMap::new();

    for file in index {
        for method in file.methods.iter().filter(|m| m.class_name.is_some()) {
            register(
                &mut exact,
                &mut varargs,
                &method.name,
                &method.parameter_types,
                method.signature(),
            );
        }
    }
    // Removed methods only survive as their signature key. Like indexed
    // declarations, they need a declaring class to be linked.
    for change in changed.iter().filter(|c| c.kind == ChangeKind::Removed) {
        if signature::extract_class_name(&change.signature).is_empty() {
            continue;
        }
        register(
            &mut exact,
            &mut varargs,
            signature::extract_method_name(&change.signature),
            &signature::extract_parameter_types(&change.signature),
            change.signature.clone(),
        );
    }

    let mut graph = CallGraph::default();
    for file in index {
        for method in file.methods.iter().filter(|m| m.class_name.is_some()) {
            let caller = method.signature();
            for call in &method.calls {
                if let Some(callees) = exact.get(&(call.name.as_str(), call.arity)) {
                    for callee in callees {
                        graph.add_edge(&caller, callee);
                    }
                }
                if let Some(callees) = varargs.get(call.name.as_str()) {
                    for (min_arity, callee) in callees {
                        if call.arity >= *min_arity {
                            graph.add_edge(&caller, callee);
                        }
                    }
                }
            }
        }
    }
    graph
}

fn register<'a>(
    exact: &mut HashMap<(&'a str, usize), Vec<String>>,
    varargs: &mut HashMap<&'a str, Vec<(usize, String)>>,
    name: &'a str,
    params: &[String],
    signature: String,
) {
    if params.last().is_some_and(|p| p.ends_with("...")) {
        varargs
            .entry(name)
            .or_default()
            .push((params.len() - 1, signature));
    } else {
        exact.entry((name, params.len())).or_default().push(signature);
    }
}
