//! Plain-text rendering of analysis results.

use paramgrid_core::{Analysis, AnalysisReport, ChainNode, DependencyEdge, EvaluationResults};
use std::fmt::Write;

pub fn summary(report: &AnalysisReport) -> String {
    let analysis = &report.analysis;
    let c = &analysis.classification;
    let mut out = String::new();

    let _ = writeln!(out, "{}", report.source.display());
    let _ = writeln!(
        out,
        "  parameters: {} ({} before deduplication)",
        analysis.parameters.len(),
        analysis.original.len()
    );
    let _ = writeln!(out, "  input:        {}", join(c.input.iter()));
    let _ = writeln!(out, "  output:       {}", join(c.output.iter()));
    let _ = writeln!(out, "  intermediate: {}", join(c.intermediate.iter()));
    let _ = writeln!(out, "  independent:  {}", join(c.independent.iter()));

    if !analysis.cycles.paths.is_empty() {
        let _ = writeln!(out, "  cycles:");
        for path in &analysis.cycles.paths {
            let _ = writeln!(out, "    {}", path.join(" -> "));
        }
    }

    let dedup = &analysis.deduplication;
    if !dedup.replacements.is_empty() {
        let _ = writeln!(out, "  merged:");
        for (replaced, canonical) in &dedup.replacements {
            let _ = writeln!(out, "    {} => {}", replaced, canonical);
        }
    }
    if !dedup.renames.is_empty() {
        let _ = writeln!(out, "  renamed:");
        for (id, name) in &dedup.renames {
            let _ = writeln!(out, "    {} => {}", id, name);
        }
    }

    if !analysis.issues.is_empty() {
        let _ = writeln!(out, "  issues:");
        for issue in &analysis.issues {
            let _ = writeln!(out, "    {}", issue);
        }
    }

    match &report.output {
        Some(path) => {
            let _ = writeln!(out, "  written to {}", path.display());
        }
        None => {
            let _ = writeln!(out, "  no output written");
        }
    }
    out
}

fn join<'a>(ids: impl Iterator<Item = &'a String>) -> String {
    let ids: Vec<&str> = ids.map(String::as_str).collect();
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}

/// One line per parameter, in evaluation order.
pub fn order(analysis: &Analysis) -> String {
    let mut out = String::new();
    for (pos, id) in analysis.order.iter().enumerate() {
        let name = analysis
            .parameters
            .get(id)
            .map(|p| p.name.as_str())
            .unwrap_or(id);
        if name == id.as_str() {
            let _ = writeln!(out, "{:>4}. {}", pos + 1, id);
        } else {
            let _ = writeln!(out, "{:>4}. {} ({})", pos + 1, name, id);
        }
    }
    out
}

pub fn edges(edges: &[DependencyEdge]) -> String {
    let mut out = String::new();
    for edge in edges {
        let _ = writeln!(out, "{} -> {}", edge.source_id, edge.target_id);
    }
    out
}

/// Dependency tree, children indented under their parent.
pub fn chain(root: &str, nodes: &[ChainNode]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", root);
    write_nodes(&mut out, nodes, 1);
    out
}

fn write_nodes(out: &mut String, nodes: &[ChainNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let unit = if node.unit.is_empty() {
            String::new()
        } else {
            format!(" {}", node.unit)
        };
        let marker = if node.is_cycle { " (cycle)" } else { "" };
        let _ = writeln!(out, "{}{} = {}{}{}", indent, node.name, node.value, unit, marker);
        write_nodes(out, &node.children, depth + 1);
    }
}

pub fn evaluation(results: &EvaluationResults) -> String {
    let mut out = String::new();
    for (id, result) in results {
        match result {
            Ok(value) => {
                let _ = writeln!(out, "{} = {}", id, value);
            }
            Err(err) => {
                let _ = writeln!(out, "{}: {}", id, err);
            }
        }
    }
    out
}
