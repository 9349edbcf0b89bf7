//! Circular dependency detection for parameter formulas.
//!
//! Every node with outgoing edges starts its own depth-first sweep with an
//! explicit stack that carries the current path. A dependency already on the
//! path closes a cycle. The same cycle is usually found from several starting
//! nodes, so cycles are deduplicated by their sorted node signature.

use indexmap::IndexSet;
use serde::Serialize;
use std::collections::HashSet;

use super::graph::{DependencyGraph, ParamId};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Every parameter on at least one cycle.
    pub circular: IndexSet<ParamId>,
    /// Distinct cycles, each closed (first id repeated at the end).
    pub paths: Vec<Vec<ParamId>>,
}

impl CycleReport {
    pub fn is_circular(&self, id: &str) -> bool {
        self.circular.contains(id)
    }
}

/// Find all parameters that take part in a dependency cycle.
pub fn detect_cycles(graph: &DependencyGraph) -> CycleReport {
    let mut report = CycleReport::default();
    let mut seen_signatures: HashSet<Vec<ParamId>> = HashSet::new();

    for (start, _) in graph.iter() {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&str, Vec<&str>)> = vec![(start.as_str(), vec![start.as_str()])];

        while let Some((node, path)) = stack.pop() {
            let Some(deps) = graph.dependencies(node) else {
                continue;
            };
            for dep in deps {
                if let Some(pos) = path.iter().position(|p| *p == dep.as_str()) {
                    let mut cycle: Vec<ParamId> =
                        path[pos..].iter().map(|p| p.to_string()).collect();
                    cycle.push(dep.clone());
                    report.circular.extend(cycle.iter().cloned());

                    let mut signature = cycle[..cycle.len() - 1].to_vec();
                    signature.sort();
                    signature.dedup();
                    if seen_signatures.insert(signature) {
                        report.paths.push(cycle);
                    }
                } else if graph.contains(dep) && visited.insert(dep.as_str()) {
                    let mut next = path.clone();
                    next.push(dep.as_str());
                    stack.push((dep.as_str(), next));
                }
            }
        }
    }

    if !report.paths.is_empty() {
        log::debug!(
            "found {} dependency cycle(s) over {} parameter(s)",
            report.paths.len(),
            report.circular.len()
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &[&str])]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (id, deps) in edges {
            g.add_dependencies(id, deps.iter().map(|d| d.to_string()));
        }
        g
    }

    #[test]
    fn test_two_node_cycle_is_reported_once() {
        let g = graph(&[("A", &["B"]), ("B", &["A"])]);
        let report = detect_cycles(&g);
        assert!(report.is_circular("A"));
        assert!(report.is_circular("B"));
        assert_eq!(report.paths.len(), 1);
        let path = &report.paths[0];
        assert_eq!(path.first(), path.last());
    }

    #[test]
    fn test_nodes_feeding_a_cycle_are_not_circular() {
        let g = graph(&[("Top", &["A"]), ("A", &["B"]), ("B", &["C"]), ("C", &["A"])]);
        let report = detect_cycles(&g);
        assert_eq!(report.circular.len(), 3);
        assert!(!report.is_circular("Top"));
    }

    #[test]
    fn test_acyclic_diamond_has_no_cycles() {
        let g = graph(&[("D", &["B", "C"]), ("B", &["A"]), ("C", &["A"])]);
        assert_eq!(detect_cycles(&g), CycleReport::default());
    }

    #[test]
    fn test_disjoint_cycles_are_both_found() {
        let g = graph(&[("A", &["B"]), ("B", &["A"]), ("X", &["Y"]), ("Y", &["Z"]), ("Z", &["X"])]);
        let report = detect_cycles(&g);
        assert_eq!(report.paths.len(), 2);
        assert_eq!(report.circular.len(), 5);
    }
}
