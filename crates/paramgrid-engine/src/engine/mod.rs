//! Parameter graph engine API.
//!
//! This module provides the pure algorithms behind a parameter analysis pass:
//!
//! - [`CellRef`] - Cell reference parsing (A1 notation ↔ column/row numbers)
//! - [`Formula`] - Typed formula tokens (text, cell and range references)
//! - [`extract_references`] - Cells and range rows a formula reads
//! - [`DependencyGraph`] - "A's formula reads B" edges between parameter ids
//! - [`detect_cycles`] - Circular dependency detection
//! - [`classify`] - Input / output / intermediate / independent roles
//! - [`topological_order`] - Evaluation order tolerating cycles
//! - [`rewrite_references`] - Reference repair after rows are deleted

mod cell_ref;
mod classify;
mod cycle;
mod deps;
mod formula;
mod graph;
mod shift;
mod topo;

pub use cell_ref::{CellRef, MAX_COL, MAX_ROW};
pub use classify::{Classification, Role, classify};
pub use cycle::{CycleReport, detect_cycles};
pub use deps::{References, RowRef, extract_references, parse_range};
pub use formula::{
    CellToken, Formula, FormulaError, RangeToken, RefPoint, Segment, sheet_prefix,
};
pub use graph::{DependencyGraph, ParamId};
pub use shift::{Retarget, RetargetMap, RowShift, rewrite_references};
pub use topo::topological_order;
