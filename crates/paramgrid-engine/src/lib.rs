//! paramgrid_engine - Dependency analysis over spreadsheet parameter formulas.

pub mod engine;
