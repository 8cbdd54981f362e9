//! Unified diff parsing
//!
//! Turns `git diff` output into per-file hunks. The impact analyzer only needs
//! to know which files changed and roughly where; method-level changes come
//! from comparing the two parse trees.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static HUNK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hardcoded hunk regex")
});

/// One changed region of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    /// Path relative to the repository root (new side, or old side for
    /// deletions)
    pub file: String,
    /// First line on the old side (1-based; 0 for additions of new files)
    pub old_start: u32,
    pub old_count: u32,
    /// First line on the new side (1-based; 0 when the file was deleted)
    pub start: u32,
    pub count: u32,
}

impl DiffHunk {
    /// True when the hunk removes the whole file.
    pub fn is_deletion(&self) -> bool {
        self.start == 0 && self.count == 0
    }
}

/// Parse `git diff` output.
///
/// - file names come from `+++ b/...`, or `--- a/...` when the new side is
///   `/dev/null`
/// - binary files are skipped
/// - an omitted count (`@@ -3 +3 @@`) means 1
pub fn parse_unified_diff(input: &str) -> Vec<DiffHunk> {
    if input.is_empty() {
        return Vec::new();
    }

    let input = if input.contains('\r') {
        std::borrow::Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        std::borrow::Cow::Borrowed(input)
    };

    let mut hunks = Vec::new();
    let mut old_file: Option<String> = None;
    let mut current_file: Option<String> = None;

    for line in input.lines() {
        if line.starts_with("diff --git ") {
            old_file = None;
            current_file = None;
            continue;
        }
        if let Some(path) = line.strip_prefix("--- ") {
            old_file = strip_side_prefix(path, "a/");
            continue;
        }
        if let Some(path) = line.strip_prefix("+++ ") {
            current_file = strip_side_prefix(path, "b/").or_else(|| old_file.clone());
            continue;
        }
        if line.starts_with("Binary files ") {
            current_file = None;
            continue;
        }

        let Some(file) = &current_file else {
            continue;
        };
        let Some(caps) = HUNK_RE.captures(line) else {
            continue;
        };

        let number = |idx: usize, default: u32| -> u32 {
            caps.get(idx)
                .map(|m| {
                    m.as_str().parse().unwrap_or_else(|_| {
                        tracing::warn!(line, file = file.as_str(), "Unparseable hunk header field");
                        default
                    })
                })
                .unwrap_or(default)
        };

        hunks.push(DiffHunk {
            file: file.clone(),
            old_start: number(1, 0),
            old_count: number(2, 1),
            start: number(3, 0),
            count: number(4, 1),
        });
    }

    hunks
}

/// Distinct files touched by `hunks`, sorted.
pub fn changed_files(hunks: &[DiffHunk]) -> BTreeSet<&str> {
    hunks.iter().map(|h| h.file.as_str()).collect()
}

fn strip_side_prefix(path: &str, prefix: &str) -> Option<String> {
    if path == "/dev/null" {
        return None;
    }
    // git may append a tab and timestamp on some configurations
    let path = path.split('\t').next().unwrap_or(path);
    Some(path.strip_prefix(prefix).unwrap_or(path).to_string())
}
