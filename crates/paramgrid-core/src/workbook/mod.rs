//! In-memory workbook model and storage.
//!
//! A [`Workbook`] is a list of sheets, each a sparse map of 1-based
//! `(row, col)` positions to cells. It is read fully before analysis and
//! written fully at the end; nothing touches the file in between.

mod csv;
mod xlsx;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{ParamgridError, Result};

pub use self::csv::{read_csv, write_csv};
pub use self::xlsx::{read_xlsx, write_xlsx};

/// A literal cell value. For formula cells this is the cached result.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Infer a value from plain text:
    /// - Empty string -> Empty
    /// - Valid number -> Number (unless it has leading zeros like "007")
    /// - TRUE / FALSE -> Bool
    /// - Otherwise -> Text
    pub fn parse_field(field: &str) -> CellValue {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if field != trimmed {
            return CellValue::Text(field.to_string());
        }
        if trimmed.starts_with('0')
            && trimmed.len() > 1
            && !trimmed.starts_with("0.")
            && trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
        {
            return CellValue::Text(trimmed.to_string());
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return CellValue::Number(n);
            }
        }
        if trimmed.eq_ignore_ascii_case("TRUE") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("FALSE") {
            return CellValue::Bool(false);
        }
        CellValue::Text(trimmed.to_string())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Number(n) => write!(f, "{}", format_number(*n)),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Bool(true) => f.write_str("TRUE"),
            CellValue::Bool(false) => f.write_str("FALSE"),
        }
    }
}

/// Format a number without a trailing `.0` for whole values.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    /// Formula body without the leading `=`.
    pub formula: Option<String>,
    /// Solid fill colour, `RRGGBB`.
    pub fill: Option<String>,
    pub bold: bool,
}

impl Cell {
    pub fn new_value(value: CellValue) -> Cell {
        Cell {
            value,
            ..Cell::default()
        }
    }

    pub fn new_formula(formula: &str, cached: CellValue) -> Cell {
        Cell {
            value: cached,
            formula: Some(formula.strip_prefix('=').unwrap_or(formula).to_string()),
            ..Cell::default()
        }
    }

    pub fn is_blank(&self) -> bool {
        self.formula.is_none() && self.value.is_empty()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Sheet {
    pub name: String,
    cells: BTreeMap<(u32, u32), Cell>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Sheet {
        Sheet {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, col: u32, row: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn get_mut(&mut self, col: u32, row: u32) -> &mut Cell {
        self.cells.entry((row, col)).or_default()
    }

    pub fn set(&mut self, col: u32, row: u32, cell: Cell) {
        self.cells.insert((row, col), cell);
    }

    pub fn set_value(&mut self, col: u32, row: u32, value: CellValue) {
        self.get_mut(col, row).value = value;
    }

    pub fn value(&self, col: u32, row: u32) -> Option<&CellValue> {
        self.get(col, row).map(|c| &c.value)
    }

    /// Cells in row-major order as `((row, col), cell)`.
    pub fn cells(&self) -> impl Iterator<Item = (&(u32, u32), &Cell)> {
        self.cells.iter()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = (&(u32, u32), &mut Cell)> {
        self.cells.iter_mut()
    }

    /// Last row holding a non-blank cell (0 for an empty sheet).
    pub fn max_row(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, c)| !c.is_blank())
            .map(|((row, _), _)| *row)
            .max()
            .unwrap_or(0)
    }

    /// Last column holding a non-blank cell (0 for an empty sheet).
    pub fn max_col(&self) -> u32 {
        self.cells
            .iter()
            .filter(|(_, c)| !c.is_blank())
            .map(|((_, col), _)| *col)
            .max()
            .unwrap_or(0)
    }

    /// Remove a row and move every row below it up by one.
    pub fn delete_row(&mut self, row: u32) {
        let below = self.cells.split_off(&(row, 0));
        for ((r, c), cell) in below {
            if r > row {
                self.cells.insert((r - 1, c), cell);
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Workbook {
        Workbook::default()
    }

    /// Read a workbook, choosing the format from the file extension.
    pub fn open(path: &Path) -> Result<Workbook> {
        match Format::from_path(path)? {
            Format::Xlsx => read_xlsx(path),
            Format::Csv => read_csv(path),
        }
    }

    /// Write a workbook, choosing the format from the file extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        match Format::from_path(path)? {
            Format::Xlsx => write_xlsx(self, path),
            Format::Csv => write_csv(self, path),
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Xlsx,
    Csv,
}

impl Format {
    fn from_path(path: &Path) -> Result<Format> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "xlsx" | "xlsm" => Ok(Format::Xlsx),
            "csv" => Ok(Format::Csv),
            _ => Err(ParamgridError::UnsupportedFormat(path.display().to_string())),
        }
    }
}
