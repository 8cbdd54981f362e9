//! Per-invocation run state
//!
//! A [`RunSession`] lives for exactly one invocation of the run command and is
//! shared by the background worker and the foreground queue. It owns the
//! accumulated [`TestPattern`] set. The set is written at most once: the first
//! collection that produces patterns wins, later collections are no-ops, so
//! the current-state run selects exactly what the head-state run selected.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

/// `fully.qualified.ClassName,methodName`, the unit a test engine consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct TestPattern {
    pub class_name: String,
    pub method_name: String,
}

impl TestPattern {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
        }
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.class_name, self.method_name)
    }
}

impl FromStr for TestPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(',') {
            Some((class, method)) if !class.is_empty() && !method.is_empty() => {
                Ok(TestPattern::new(class.trim(), method.trim()))
            }
            _ => Err(format!("Not a test pattern (expected Class,method): {s}")),
        }
    }
}

/// Session-scoped context. Create one per invocation; dropping it discards
/// the pattern set.
#[derive(Debug, Default)]
pub struct RunSession {
    patterns: Mutex<Vec<TestPattern>>,
}

impl RunSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the pattern set unless it already has entries.
    ///
    /// `collect` only runs when the set is empty. Duplicates are dropped,
    /// first occurrence keeps its position. Returns the number of patterns
    /// added (0 when the set was already populated).
    pub fn populate_once<F>(&self, collect: F) -> usize
    where
        F: FnOnce() -> Vec<TestPattern>,
    {
        let mut guard = self.patterns.lock().unwrap_or_else(|p| p.into_inner());
        if !guard.is_empty() {
            tracing::debug!(existing = guard.len(), "Pattern set already populated");
            return 0;
        }

        let mut seen = HashSet::new();
        for pattern in collect() {
            if seen.insert(pattern.clone()) {
                guard.push(pattern);
            }
        }
        guard.len()
    }

    /// Snapshot of the current pattern set, in insertion order.
    pub fn patterns(&self) -> Vec<TestPattern> {
        self.patterns
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn is_populated(&self) -> bool {
        !self
            .patterns
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_display_and_parse() {
        let p = TestPattern::new("com.acme.CartTest", "addsItem");
        assert_eq!(p.to_string(), "com.acme.CartTest,addsItem");
        assert_eq!("com.acme.CartTest,addsItem".parse::<TestPattern>().unwrap(), p);
        assert!("noComma".parse::<TestPattern>().is_err());
        assert!(",m".parse::<TestPattern>().is_err());
    }

    #[test]
    fn populate_once_first_writer_wins() {
        let session = RunSession::new();
        let added = session.populate_once(|| vec![TestPattern::new("A", "a")]);
        assert_eq!(added, 1);

        let mut called = false;
        let added = session.populate_once(|| {
            called = true;
            vec![TestPattern::new("B", "b")]
        });
        assert_eq!(added, 0);
        assert!(!called, "collector must not run once populated");
        assert_eq!(session.patterns(), vec![TestPattern::new("A", "a")]);
    }

    #[test]
    fn empty_collection_leaves_session_open() {
        let session = RunSession::new();
        assert_eq!(session.populate_once(Vec::new), 0);
        assert!(!session.is_populated());
        assert_eq!(session.populate_once(|| vec![TestPattern::new("A", "a")]), 1);
    }

    #[test]
    fn duplicates_are_dropped_keeping_order() {
        let session = RunSession::new();
        session.populate_once(|| {
            vec![
                TestPattern::new("B", "b"),
                TestPattern::new("A", "a"),
                TestPattern::new("B", "b"),
            ]
        });
        assert_eq!(
            session.patterns(),
            vec![TestPattern::new("B", "b"), TestPattern::new("A", "a")]
        );
    }
}
