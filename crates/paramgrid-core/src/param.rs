//! The parameter table.

use indexmap::{IndexMap, IndexSet};
use paramgrid_engine::engine::ParamId;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

use crate::workbook::{CellValue, format_number};

/// A parameter's value: a literal, or the cached result of its formula.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    Bool(bool),
    #[default]
    Unset,
}

impl ParamValue {
    pub fn is_unset(&self) -> bool {
        matches!(self, ParamValue::Unset)
    }

    /// Exact-equality key used to group duplicates.
    pub fn key(&self) -> ValueKey {
        match self {
            ParamValue::Number(n) => {
                let n = if *n == 0.0 { 0.0 } else { *n };
                ValueKey::Number(n.to_bits())
            }
            ParamValue::Bool(b) => ValueKey::Bool(*b),
            ParamValue::Text(s) => ValueKey::Text(s.clone()),
            ParamValue::Unset => ValueKey::Unset,
        }
    }
}

impl From<&CellValue> for ParamValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => ParamValue::Unset,
            CellValue::Number(n) => ParamValue::Number(*n),
            CellValue::Text(s) if s.trim().is_empty() => ParamValue::Unset,
            CellValue::Text(s) => ParamValue::Text(s.clone()),
            CellValue::Bool(b) => ParamValue::Bool(*b),
        }
    }
}

impl From<&ParamValue> for CellValue {
    fn from(value: &ParamValue) -> Self {
        match value {
            ParamValue::Number(n) => CellValue::Number(*n),
            ParamValue::Text(s) => CellValue::Text(s.clone()),
            ParamValue::Bool(b) => CellValue::Bool(*b),
            ParamValue::Unset => CellValue::Empty,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(n) => f.write_str(&format_number(*n)),
            ParamValue::Text(s) => f.write_str(s),
            ParamValue::Bool(true) => f.write_str("TRUE"),
            ParamValue::Bool(false) => f.write_str("FALSE"),
            ParamValue::Unset => f.write_str("(unset)"),
        }
    }
}

/// Hashable, totally ordered view of a [`ParamValue`].
///
/// Orders set values before unset, then numbers < booleans < text.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Number(u64),
    Bool(bool),
    Text(String),
    Unset,
}

impl ValueKey {
    fn rank(&self) -> u8 {
        match self {
            ValueKey::Number(_) => 0,
            ValueKey::Bool(_) => 1,
            ValueKey::Text(_) => 2,
            ValueKey::Unset => 3,
        }
    }
}

impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ValueKey::Number(a), ValueKey::Number(b)) => f64::from_bits(*a).total_cmp(&f64::from_bits(*b)),
            (ValueKey::Bool(a), ValueKey::Bool(b)) => a.cmp(b),
            (ValueKey::Text(a), ValueKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    pub id: ParamId,
    pub name: String,
    pub unit: String,
    pub sheet: String,
    pub row: u32,
    pub value: ParamValue,
    /// Formula body without the leading `=`.
    pub formula: Option<String>,
    /// The formula with single-cell references replaced by parameter names.
    pub human_formula: String,
    pub dependencies: IndexSet<ParamId>,
    pub dependency_names: IndexSet<String>,
    pub has_cycle: bool,
}

impl Parameter {
    pub fn has_formula(&self) -> bool {
        self.formula.is_some()
    }

    /// Plain data rows outrank formula rows when picking a canonical duplicate.
    pub fn is_plain(&self) -> bool {
        self.formula.is_none() && self.dependencies.is_empty()
    }
}

/// Parameters by id, in workbook order.
pub type ParameterTable = IndexMap<ParamId, Parameter>;
