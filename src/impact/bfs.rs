//! Reverse call-graph traversal

use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

/// Caller/callee edges between method signatures.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    /// callee signature -> caller signatures
    pub reverse: HashMap<String, Vec<String>>,
}

impl CallGraph {
    pub fn add_edge(&mut self, caller: &str, callee: &str) {
        let callers = self.reverse.entry(callee.to_string()).or_default();
        if !callers.iter().any(|c| c == caller) {
            callers.push(caller.to_string());
        }
    }

    pub fn edge_count(&self) -> usize {
        self.reverse.values().map(Vec::len).sum()
    }
}

/// Multi-source reverse BFS.
///
/// Every target starts at depth 0; every node gets the minimum distance from
/// any target. Nodes further than `max_depth` are not visited.
pub(super) fn reverse_bfs_multi(
    graph: &CallGraph,
    targets: &[&str],
    max_depth: usize,
) -> HashMap<String, usize> {
    let mut reached: HashMap<String, usize> = HashMap::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();

    for &target in targets {
        reached.insert(target.to_string(), 0);
        queue.push_back((target.to_string(), 0));
    }

    while let Some((current, d)) = queue.pop_front() {
        if d >= max_depth {
            continue;
        }
        let Some(callers) = graph.reverse.get(&current) else {
            continue;
        };
        for caller in callers {
            match reached.entry(caller.clone()) {
                Entry::Vacant(e) => {
                    e.insert(d + 1);
                    queue.push_back((caller.clone(), d + 1));
                }
                Entry::Occupied(mut e) => {
                    if d + 1 < *e.get() {
                        *e.get_mut() = d + 1;
                        queue.push_back((caller.clone(), d + 1));
                    }
                }
            }
        }
    }

    reached
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> CallGraph {
        // A -> B -> C, D -> C
        let mut g = CallGraph::default();
        g.add_edge("A", "B");
        g.add_edge("B", "C");
        g.add_edge("D", "C");
        g
    }

    #[test]
    fn empty_targets() {
        assert!(reverse_bfs_multi(&chain(), &[], 5).is_empty());
    }

    #[test]
    fn walks_callers_with_depth() {
        let r = reverse_bfs_multi(&chain(), &["C"], 5);
        assert_eq!(r["C"], 0);
        assert_eq!(r["B"], 1);
        assert_eq!(r["D"], 1);
        assert_eq!(r["A"], 2);
    }

    #[test]
    fn respects_max_depth() {
        let r = reverse_bfs_multi(&chain(), &["C"], 1);
        assert_eq!(r.len(), 3);
        assert!(!r.contains_key("A"));
    }

    #[test]
    fn minimum_depth_across_targets() {
        let r = reverse_bfs_multi(&chain(), &["C", "B"], 5);
        assert_eq!(r["B"], 0);
        assert_eq!(r["A"], 1);
    }

    #[test]
    fn cycles_terminate() {
        let mut g = CallGraph::default();
        g.add_edge("A", "B");
        g.add_edge("B", "A");
        let r = reverse_bfs_multi(&g, &["A"], 10);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn duplicate_edges_are_ignored() {
        let mut g = CallGraph::default();
        g.add_edge("A", "B");
        g.add_edge("A", "B");
        assert_eq!(g.edge_count(), 1);
    }
}
