//! The analysis pass: workbook in, normalized parameter model out.
//!
//! [`analyze_workbook`] is pure and works on an in-memory [`Workbook`];
//! [`analyze_file`] adds the file boundary (read, rewrite, save). Each call
//! owns all of its state.

mod evaluate;
mod rewrite;
mod views;

use paramgrid_engine::engine::{
    Classification, CycleReport, DependencyGraph, ParamId, classify, detect_cycles,
    topological_order,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::collect::{Resolver, collect_parameters};
use crate::dedup::{Deduplication, apply_deduplication, plan_deduplication};
use crate::error::{Issue, Result};
use crate::options::AnalysisOptions;
use crate::param::ParameterTable;
use crate::reader::read_rows;
use crate::workbook::Workbook;

pub use evaluate::{
    CachedValueEvaluator, EvaluationError, EvaluationRequest, EvaluationResults, Evaluator,
};
pub use rewrite::{DEPENDENCIES_HEADER, FORMULA_HEADER, RewriteOutcome, rewrite_workbook};
pub use views::{
    ChainNode, DependencyEdge, ParameterDetails, dependency_chain, dependency_edges,
    parameter_details,
};

#[derive(Clone, Debug, Default, Serialize)]
pub struct Analysis {
    /// The table as read, before deduplication.
    pub original: ParameterTable,
    /// Roles in the graph as read.
    pub original_classification: Classification,
    /// Surviving parameters after deduplication.
    pub parameters: ParameterTable,
    pub graph: DependencyGraph,
    pub cycles: CycleReport,
    pub classification: Classification,
    pub deduplication: Deduplication,
    /// Evaluation order, dependencies before dependents.
    pub order: Vec<ParamId>,
    pub issues: Vec<Issue>,
}

impl Analysis {
    pub fn parameter(&self, id: &str) -> Option<&crate::param::Parameter> {
        self.parameters.get(id)
    }
}

/// Run the whole pass on an in-memory workbook.
pub fn analyze_workbook(workbook: &Workbook, options: &AnalysisOptions) -> Analysis {
    let layout = &options.layout;
    let sheet_rows = read_rows(workbook, layout);
    let mut issues = sheet_rows.issues;

    let mut collected = collect_parameters(&sheet_rows.rows, layout);
    issues.append(&mut collected.issues);

    let original_cycles = detect_cycles(&collected.graph);
    for id in &original_cycles.circular {
        if let Some(param) = collected.parameters.get_mut(id) {
            param.has_cycle = true;
        }
    }
    let original_classification = classify(
        collected.parameters.keys().map(String::as_str),
        &collected.graph,
        &original_cycles.circular,
    );

    let deduplication = plan_deduplication(&collected.parameters);
    let resolver = Resolver::new(&collected.index, layout);
    let mut parameters = apply_deduplication(
        &collected.parameters,
        &collected.formulas,
        &resolver,
        &deduplication,
    );

    let mut graph = collected.graph.substitute(&deduplication.replacements);
    for (from, to) in graph.retain_known(|id| parameters.contains_key(id)) {
        if let Some(param) = parameters.get_mut(&from) {
            param.dependencies.shift_remove(&to);
        }
        issues.push(Issue::Integrity { from, to }.logged());
    }

    let cycles = detect_cycles(&graph);
    for param in parameters.values_mut() {
        param.has_cycle = cycles.is_circular(&param.id);
    }
    for path in &cycles.paths {
        log::warn!("circular dependency: {}", path.join(" -> "));
    }
    let classification = classify(parameters.keys().map(String::as_str), &graph, &cycles.circular);
    let order = topological_order(parameters.keys().map(String::as_str), &graph);

    log::info!(
        "analysis: {} parameters ({} input, {} output, {} intermediate, {} independent), {} cycle(s)",
        parameters.len(),
        classification.input.len(),
        classification.output.len(),
        classification.intermediate.len(),
        classification.independent.len(),
        cycles.paths.len()
    );

    Analysis {
        original: collected.parameters,
        original_classification,
        parameters,
        graph,
        cycles,
        classification,
        deduplication,
        order,
        issues,
    }
}

/// Result of [`analyze_file`].
#[derive(Clone, Debug, Serialize)]
pub struct AnalysisReport {
    pub source: PathBuf,
    /// The rewritten workbook, when one was written.
    pub output: Option<PathBuf>,
    pub analysis: Analysis,
}

/// `{stem}{suffix}.{ext}` next to the input.
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(name)
}

/// Read a workbook, analyze it and, unless disabled, write the rewritten
/// copy to `output` (or the default path beside the input).
///
/// Only failing to read or write a file is an error; everything else ends up
/// in [`Analysis::issues`].
pub fn analyze_file(path: &Path, options: &AnalysisOptions, output: Option<&Path>) -> Result<AnalysisReport> {
    let workbook = Workbook::open(path)?;
    log::info!("analyzing {} ({} sheet(s))", path.display(), workbook.sheets.len());
    let mut analysis = analyze_workbook(&workbook, options);

    let output = if options.write_output {
        let out = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(path, &options.output_suffix));
        let mut outcome = rewrite_workbook(&workbook, &analysis, options);
        analysis.issues.append(&mut outcome.issues);
        outcome.workbook.save(&out)?;
        log::info!("wrote {}", out.display());
        Some(out)
    } else {
        None
    };

    Ok(AnalysisReport {
        source: path.to_path_buf(),
        output,
        analysis,
    })
}
