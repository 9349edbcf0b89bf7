//! Read-only views over an analysis for rendering: edge lists, dependency
//! chains and per-parameter details.

use indexmap::IndexSet;
use paramgrid_engine::engine::{ParamId, Role};
use serde::Serialize;

use super::Analysis;
use crate::param::{ParamValue, Parameter};

/// One "source reads target" edge, with display names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub source: String,
    pub source_id: ParamId,
    pub target: String,
    pub target_id: ParamId,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChainNode {
    pub id: ParamId,
    pub name: String,
    pub value: ParamValue,
    pub unit: String,
    /// Set when this dependency is already on the path above it; such a
    /// node is not expanded further.
    pub is_cycle: bool,
    pub children: Vec<ChainNode>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParameterDetails {
    pub parameter: Parameter,
    pub role: Option<Role>,
    /// Ids whose formulas read this parameter.
    pub dependents: Vec<ParamId>,
    pub chain: Vec<ChainNode>,
}

/// Every edge of the final graph whose endpoints are both known.
pub fn dependency_edges(analysis: &Analysis) -> Vec<DependencyEdge> {
    let mut edges = Vec::with_capacity(analysis.graph.edge_count());
    for (source_id, deps) in analysis.graph.iter() {
        let Some(source) = analysis.parameters.get(source_id) else {
            continue;
        };
        for target_id in deps {
            let Some(target) = analysis.parameters.get(target_id) else {
                continue;
            };
            edges.push(DependencyEdge {
                source: source.name.clone(),
                source_id: source_id.clone(),
                target: target.name.clone(),
                target_id: target_id.clone(),
            });
        }
    }
    edges
}

/// The dependencies of `id`, expanded recursively.
pub fn dependency_chain(analysis: &Analysis, id: &str) -> Vec<ChainNode> {
    let mut path: IndexSet<String> = IndexSet::new();
    path.insert(id.to_string());
    expand(analysis, id, &mut path)
}

fn expand(analysis: &Analysis, id: &str, path: &mut IndexSet<String>) -> Vec<ChainNode> {
    let Some(deps) = analysis.graph.dependencies(id) else {
        return Vec::new();
    };
    let mut nodes = Vec::with_capacity(deps.len());
    for dep in deps {
        let Some(param) = analysis.parameters.get(dep) else {
            continue;
        };
        let is_cycle = path.contains(dep.as_str());
        let children = if is_cycle {
            Vec::new()
        } else {
            path.insert(dep.clone());
            let children = expand(analysis, dep, path);
            path.shift_remove(dep.as_str());
            children
        };
        nodes.push(ChainNode {
            id: dep.clone(),
            name: param.name.clone(),
            value: param.value.clone(),
            unit: param.unit.clone(),
            is_cycle,
            children,
        });
    }
    nodes
}

pub fn parameter_details(analysis: &Analysis, id: &str) -> Option<ParameterDetails> {
    let parameter = analysis.parameters.get(id)?.clone();
    let dependents = analysis
        .graph
        .iter()
        .filter(|(_, deps)| deps.contains(id))
        .map(|(source, _)| source.clone())
        .collect();
    Some(ParameterDetails {
        role: analysis.classification.role_of(id),
        chain: dependency_chain(analysis, id),
        dependents,
        parameter,
    })
}
