//! Evaluation order for parameters.
//!
//! Kahn's algorithm: a parameter is emitted once every parameter it reads has
//! been emitted. Ties keep the order the ids were supplied in. Whatever is
//! left when the queue drains sits on or behind a cycle and is appended in
//! supplied order, so the result always covers every id exactly once.

use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

use super::graph::{DependencyGraph, ParamId};

pub fn topological_order<'a, I>(ids: I, graph: &DependencyGraph) -> Vec<ParamId>
where
    I: IntoIterator<Item = &'a str>,
{
    let ids: IndexSet<&str> = ids.into_iter().collect();
    let mut pending: IndexMap<&str, usize> = IndexMap::with_capacity(ids.len());
    for id in &ids {
        let count = graph
            .dependencies(id)
            .map(|deps| deps.iter().filter(|d| ids.contains(d.as_str())).count())
            .unwrap_or(0);
        pending.insert(*id, count);
    }
    let dependents = graph.dependents();

    let mut queue: VecDeque<&str> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut order: Vec<ParamId> = Vec::with_capacity(ids.len());
    let mut emitted: IndexSet<&str> = IndexSet::with_capacity(ids.len());

    while let Some(current) = queue.pop_front() {
        order.push(current.to_string());
        emitted.insert(current);
        let Some(readers) = dependents.get(current) else {
            continue;
        };
        for reader in readers {
            if let Some(count) = pending.get_mut(reader.as_str()) {
                *count -= 1;
                if *count == 0 {
                    queue.push_back(reader.as_str());
                }
            }
        }
    }

    if order.len() < ids.len() {
        let remaining: Vec<&str> = ids.iter().copied().filter(|id| !emitted.contains(id)).collect();
        log::warn!(
            "dependency cycle prevents a strict order; appending {} parameter(s): {}",
            remaining.len(),
            remaining.join(", ")
        );
        order.extend(remaining.into_iter().map(str::to_string));
    }
    order
}
