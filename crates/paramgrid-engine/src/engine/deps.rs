//! Reference extraction from tokenized formulas.
//!
//! Finds every cell a formula reads, as single-cell references and as
//! ranges expanded to the individual rows they cover. A parameter occupies
//! one row, so rows are what the dependency graph is built from.

use super::cell_ref::CellRef;
use super::formula::Formula;

const MAX_DEPENDENCY_RANGE_ROWS: u32 = 1_000_000;

/// A referenced row, with the sheet qualifier as written (None = anchor sheet).
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct RowRef {
    pub sheet: Option<String>,
    pub row: u32,
}

/// References found in one formula.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct References {
    /// Single-cell references in formula order.
    pub direct: Vec<(Option<String>, CellRef)>,
    /// Rows covered by range references, in formula order.
    pub range_rows: Vec<RowRef>,
}

impl References {
    /// All referenced rows, direct references first.
    pub fn rows(&self) -> impl Iterator<Item = RowRef> + '_ {
        self.direct
            .iter()
            .map(|(sheet, cell)| RowRef {
                sheet: sheet.clone(),
                row: cell.row,
            })
            .chain(self.range_rows.iter().cloned())
    }
}

/// Extract all cell and range references from a formula.
pub fn extract_references(formula: &Formula) -> References {
    let mut refs = References::default();

    for cell in formula.cells() {
        refs.direct.push((cell.sheet.clone(), cell.point.cell));
    }

    for range in formula.ranges() {
        let (min_row, max_row) = range.row_span();
        if max_row - min_row >= MAX_DEPENDENCY_RANGE_ROWS {
            log::warn!(
                "range {}:{} covers more than {} rows; its rows are not tracked",
                range.start,
                range.end,
                MAX_DEPENDENCY_RANGE_ROWS
            );
            continue;
        }
        for row in min_row..=max_row {
            refs.range_rows.push(RowRef {
                sheet: range.sheet.clone(),
                row,
            });
        }
    }

    refs
}

/// Parse a cell range like "A1:B5" and return (start_col, start_row, end_col, end_row).
pub fn parse_range(range: &str) -> Option<(u32, u32, u32, u32)> {
    let (start, end) = range.split_once(':')?;
    let start = CellRef::from_str(start)?;
    let end = CellRef::from_str(end)?;
    Some((start.col, start.row, end.col, end.row))
}
