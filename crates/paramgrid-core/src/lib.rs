//! Paramgrid core: workbook storage and the parameter analysis pass.
//!
//! A workbook lists one parameter per row (name, unit, value or formula).
//! The pass assigns ids, builds the dependency graph from formula
//! references, classifies parameters, merges duplicates and writes a
//! rewritten workbook whose formulas still point at the right rows.

pub mod analysis;
pub mod collect;
pub mod dedup;
pub mod error;
pub mod ids;
pub mod options;
pub mod param;
pub mod reader;
pub mod workbook;

pub use analysis::{
    Analysis, AnalysisReport, CachedValueEvaluator, ChainNode, DependencyEdge, EvaluationError,
    EvaluationRequest, EvaluationResults, Evaluator, ParameterDetails, RewriteOutcome,
    analyze_file, analyze_workbook, default_output_path, dependency_chain, dependency_edges,
    parameter_details, rewrite_workbook,
};
pub use dedup::{Deduplication, ValueGroup};
pub use error::{Issue, ParamgridError, Result};
pub use options::{AnalysisOptions, Palette, SheetLayout};
pub use param::{ParamValue, Parameter, ParameterTable};
pub use workbook::{Cell, CellValue, Sheet, Workbook};

pub use paramgrid_engine::engine::{Classification, CycleReport, DependencyGraph, ParamId, Role};
