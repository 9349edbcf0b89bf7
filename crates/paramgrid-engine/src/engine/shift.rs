//! Row shifting and reference repair after rows are deleted.
//!
//! Rows are always named in their original (pre-deletion) coordinates here.
//! [`RowShift`] answers "how far did this row move up", and
//! [`rewrite_references`] repairs one formula in two passes over its typed
//! references:
//!
//! - references to a replaced parameter's row are retargeted to the
//!   canonical parameter's post-deletion location
//! - every other reference moves up by the number of deleted rows above it;
//!   range endpoints move independently

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;

use super::formula::{CellToken, Formula, RangeToken, Segment};

/// Deleted rows per sheet, in original coordinates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RowShift {
    deleted: IndexMap<String, Vec<u32>>,
}

impl RowShift {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deletion(&mut self, sheet: &str, row: u32) {
        let rows = self.deleted.entry(sheet.to_string()).or_default();
        if let Err(pos) = rows.binary_search(&row) {
            rows.insert(pos, row);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.deleted.values().all(Vec::is_empty)
    }

    pub fn deleted_rows(&self, sheet: &str) -> &[u32] {
        self.deleted.get(sheet).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_deleted(&self, sheet: &str, row: u32) -> bool {
        self.deleted_rows(sheet).binary_search(&row).is_ok()
    }

    /// Number of deleted rows strictly above `row`.
    pub fn shift(&self, sheet: &str, row: u32) -> u32 {
        let rows = self.deleted_rows(sheet);
        rows.partition_point(|r| *r < row) as u32
    }

    /// Post-deletion row number, or None if the row itself was deleted.
    pub fn shifted_row(&self, sheet: &str, row: u32) -> Option<u32> {
        if self.is_deleted(sheet, row) {
            None
        } else {
            Some(row - self.shift(sheet, row))
        }
    }
}

/// Post-deletion location a replaced row's references are redirected to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Retarget {
    pub sheet: String,
    pub row: u32,
}

/// Replaced rows, keyed by their original `(sheet, row)`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RetargetMap {
    targets: HashMap<(String, u32), Retarget>,
}

impl RetargetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, sheet: &str, row: u32, target: Retarget) {
        self.targets.insert((sheet.to_string(), row), target);
    }

    pub fn get(&self, sheet: &str, row: u32) -> Option<&Retarget> {
        self.targets.get(&(sheet.to_string(), row))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

const REF_ERROR: &str = "#REF!";

/// Repair the references of a formula that lives on `anchor_sheet`.
///
/// Single-cell references to a retargeted row take the canonical location
/// (column kept). Remaining references shift up; a single reference to a
/// deleted row that has no retarget becomes `#REF!`. A range start on a
/// deleted row moves to the next surviving row, a range end to the previous
/// one; a range with no surviving rows becomes `#REF!`.
pub fn rewrite_references(
    formula: &Formula,
    anchor_sheet: &str,
    retargets: &RetargetMap,
    shifts: &RowShift,
) -> Formula {
    formula.map_references(
        |cell| rewrite_cell(cell, anchor_sheet, retargets, shifts),
        |range| rewrite_range(range, anchor_sheet, shifts),
    )
}

fn rewrite_cell(
    cell: &CellToken,
    anchor_sheet: &str,
    retargets: &RetargetMap,
    shifts: &RowShift,
) -> Segment {
    let sheet = cell.sheet_or(anchor_sheet);
    let row = cell.point.cell.row;

    if let Some(target) = retargets.get(sheet, row) {
        let qualifier = if cell.sheet.is_some() || target.sheet != anchor_sheet {
            Some(target.sheet.clone())
        } else {
            None
        };
        return Segment::Cell(CellToken {
            sheet: qualifier,
            point: cell.point.with_row(target.row),
        });
    }

    match shifts.shifted_row(sheet, row) {
        Some(new_row) => Segment::Cell(CellToken {
            sheet: cell.sheet.clone(),
            point: cell.point.with_row(new_row),
        }),
        None => Segment::Text(REF_ERROR.to_string()),
    }
}

fn rewrite_range(range: &RangeToken, anchor_sheet: &str, shifts: &RowShift) -> Segment {
    let sheet = range.sheet_or(anchor_sheet);
    let (first, last) = range.row_span();
    let new_first = first - shifts.shift(sheet, first);
    let mut new_last = last - shifts.shift(sheet, last);
    if shifts.is_deleted(sheet, last) {
        new_last = new_last.saturating_sub(1);
    }
    if new_last < new_first {
        return Segment::Text(REF_ERROR.to_string());
    }

    let (start, end) = if range.start.cell.row <= range.end.cell.row {
        (range.start.with_row(new_first), range.end.with_row(new_last))
    } else {
        (range.start.with_row(new_last), range.end.with_row(new_first))
    };
    Segment::Range(RangeToken {
        sheet: range.sheet.clone(),
        start,
        end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shifts(sheet: &str, rows: &[u32]) -> RowShift {
        let mut s = RowShift::new();
        for row in rows.iter().rev() {
            s.record_deletion(sheet, *row);
        }
        s
    }

    fn rewrite(text: &str, anchor: &str, retargets: &RetargetMap, shifts: &RowShift) -> String {
        let formula = Formula::parse(text).unwrap();
        rewrite_references(&formula, anchor, retargets, shifts).to_string()
    }

    #[test]
    fn test_shift_counts_rows_above() {
        let s = shifts("S", &[3, 5]);
        assert_eq!(s.shift("S", 2), 0);
        assert_eq!(s.shift("S", 4), 1);
        assert_eq!(s.shift("S", 6), 2);
        assert_eq!(s.shifted_row("S", 6), Some(4));
        assert_eq!(s.shifted_row("S", 5), None);
        assert_eq!(s.shift("Other", 6), 0);
    }

    #[test]
    fn test_plain_references_shift_without_prefix_collisions() {
        let s = shifts("S", &[3]);
        let out = rewrite("C2+C4*C20+$C$4", "S", &RetargetMap::new(), &s);
        assert_eq!(out, "C2+C3*C19+$C$3");
    }

    #[test]
    fn test_replaced_reference_points_at_canonical_after_shift() {
        // X at row 4 duplicates X at row 6; rows 2 and 4 are deleted.
        let s = shifts("S", &[2, 4]);
        let mut retargets = RetargetMap::new();
        retargets.insert("S", 4, Retarget { sheet: "S".to_string(), row: 4 });
        let out = rewrite("C4+C6", "S", &retargets, &s);
        // C4 -> canonical (row 6, now row 4); C6 shifts by 2 -> row 4 as well.
        assert_eq!(out, "C4+C4");
    }

    #[test]
    fn test_cross_sheet_retarget_gets_qualifier() {
        let s = shifts("S", &[3]);
        let mut retargets = RetargetMap::new();
        retargets.insert("S", 3, Retarget { sheet: "Base Data".to_string(), row: 2 });
        let out = rewrite("C3*2", "S", &retargets, &s);
        assert_eq!(out, "'Base Data'!C2*2");
    }

    #[test]
    fn test_qualified_references_use_their_own_sheet_shift() {
        let s = shifts("Data", &[2]);
        let out = rewrite("Data!C5+C5", "S", &RetargetMap::new(), &s);
        assert_eq!(out, "Data!C4+C5");
    }

    #[test]
    fn test_range_endpoints_shift_independently() {
        let s = shifts("S", &[3, 6]);
        assert_eq!(rewrite("SUM(C2:C5)", "S", &RetargetMap::new(), &s), "SUM(C2:C4)");
        assert_eq!(rewrite("SUM(C3:C6)", "S", &RetargetMap::new(), &s), "SUM(C3:C4)");
        assert_eq!(rewrite("SUM(C7:C9)", "S", &RetargetMap::new(), &s), "SUM(C5:C7)");
        assert_eq!(rewrite("SUM(C6:C6)", "S", &RetargetMap::new(), &s), "SUM(#REF!)");
    }

    #[test]
    fn test_deleted_reference_without_retarget_becomes_ref_error() {
        let s = shifts("S", &[3]);
        assert_eq!(rewrite("C3+1", "S", &RetargetMap::new(), &s), "#REF!+1");
    }
}
