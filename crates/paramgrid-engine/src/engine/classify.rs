//! Parameter roles derived from the dependency graph.
//!
//! - input: read by formulas, never a formula reading others
//! - output: reads others, read by nobody
//! - intermediate: both, or on a cycle
//! - independent: neither

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::graph::{DependencyGraph, ParamId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
    Intermediate,
    Independent,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub input: IndexSet<ParamId>,
    pub output: IndexSet<ParamId>,
    pub intermediate: IndexSet<ParamId>,
    pub independent: IndexSet<ParamId>,
}

impl Classification {
    pub fn role_of(&self, id: &str) -> Option<Role> {
        if self.input.contains(id) {
            Some(Role::Input)
        } else if self.output.contains(id) {
            Some(Role::Output)
        } else if self.intermediate.contains(id) {
            Some(Role::Intermediate)
        } else if self.independent.contains(id) {
            Some(Role::Independent)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.input.len() + self.output.len() + self.intermediate.len() + self.independent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition `all_ids` into the four roles. Every id lands in exactly one set,
/// in the order `all_ids` yields them.
pub fn classify<'a, I>(all_ids: I, graph: &DependencyGraph, circular: &IndexSet<ParamId>) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    let depended = graph.targets();
    let dependency = graph.sources();
    let mut out = Classification::default();

    for id in all_ids {
        let is_target = depended.contains(id);
        let is_source = dependency.contains(id);
        let set = if circular.contains(id) || (is_target && is_source) {
            &mut out.intermediate
        } else if is_source {
            &mut out.output
        } else if is_target {
            &mut out.input
        } else {
            &mut out.independent
        };
        set.insert(id.to_string());
    }
    out
}
