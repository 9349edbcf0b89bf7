//! Parameter dependency graph.
//!
//! An edge `A -> B` means "A's formula reads B". Only parameters with at
//! least one dependency get an entry; everything else has an implicitly
//! empty set.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// Globally unique parameter identifier.
pub type ParamId = String;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    edges: IndexMap<ParamId, IndexSet<ParamId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Union `deps` into the dependency set of `id`. Self-edges are dropped
    /// and no entry is created when nothing remains.
    pub fn add_dependencies<I>(&mut self, id: &str, deps: I)
    where
        I: IntoIterator<Item = ParamId>,
    {
        let deps: IndexSet<ParamId> = deps.into_iter().filter(|d| d != id).collect();
        if deps.is_empty() {
            return;
        }
        self.edges.entry(id.to_string()).or_default().extend(deps);
    }

    pub fn dependencies(&self, id: &str) -> Option<&IndexSet<ParamId>> {
        self.edges.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.edges.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParamId, &IndexSet<ParamId>)> {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(IndexSet::len).sum()
    }

    /// Ids that read from at least one other id.
    pub fn sources(&self) -> IndexSet<&str> {
        self.edges
            .iter()
            .filter(|(_, deps)| !deps.is_empty())
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids that are read by at least one other id.
    pub fn targets(&self) -> IndexSet<&str> {
        self.edges
            .values()
            .flat_map(|deps| deps.iter().map(String::as_str))
            .collect()
    }

    /// Reverse map: id -> ids whose formulas read it.
    pub fn dependents(&self) -> IndexMap<ParamId, IndexSet<ParamId>> {
        let mut reverse: IndexMap<ParamId, IndexSet<ParamId>> = IndexMap::new();
        for (id, deps) in &self.edges {
            for dep in deps {
                reverse.entry(dep.clone()).or_default().insert(id.clone());
            }
        }
        reverse
    }

    /// Drop every edge whose endpoints are not both known. Returns the dropped
    /// `(from, to)` pairs.
    pub fn retain_known<F>(&mut self, known: F) -> Vec<(ParamId, ParamId)>
    where
        F: Fn(&str) -> bool,
    {
        let mut dropped = Vec::new();
        for (id, deps) in self.edges.iter_mut() {
            if !known(id) {
                dropped.extend(deps.drain(..).map(|dep| (id.clone(), dep)));
                continue;
            }
            deps.retain(|dep| {
                let keep = known(dep);
                if !keep {
                    dropped.push((id.clone(), dep.clone()));
                }
                keep
            });
        }
        self.edges.retain(|_, deps| !deps.is_empty());
        dropped
    }

    /// Apply a replacement plan: entries of replaced ids are removed and
    /// every dependency on a replaced id is redirected to its canonical id.
    /// Edges collapsing onto their own source are dropped.
    pub fn substitute(&self, replacements: &IndexMap<ParamId, ParamId>) -> DependencyGraph {
        let mut out = DependencyGraph::new();
        for (id, deps) in &self.edges {
            if replacements.contains_key(id) {
                continue;
            }
            let new_deps: Vec<ParamId> = deps
                .iter()
                .map(|dep| replacements.get(dep).unwrap_or(dep).clone())
                .collect();
            out.add_dependencies(id, new_deps);
        }
        out
    }
}

impl FromIterator<(ParamId, IndexSet<ParamId>)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (ParamId, IndexSet<ParamId>)>>(iter: T) -> Self {
        let mut graph = DependencyGraph::new();
        for (id, deps) in iter {
            graph.add_dependencies(&id, deps);
        }
        graph
    }
}
