//! Sheet Reader: one raw record per named data row.

use crate::error::Issue;
use crate::options::SheetLayout;
use crate::workbook::{CellValue, Sheet, Workbook};

#[derive(Clone, Debug, PartialEq)]
pub struct RawRow {
    pub sheet: String,
    pub row: u32,
    pub name: String,
    pub unit: String,
    /// Literal value, or the cached result for formula rows.
    pub value: CellValue,
    /// Formula body without the leading `=`.
    pub formula: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SheetRows {
    pub rows: Vec<RawRow>,
    pub issues: Vec<Issue>,
}

/// Read every data row of every structurally valid sheet. Rows without a
/// name never become parameters. Sheets too small for the layout are
/// skipped and reported.
pub fn read_rows(workbook: &Workbook, layout: &SheetLayout) -> SheetRows {
    let mut out = SheetRows::default();
    for sheet in &workbook.sheets {
        if let Err(reason) = check_structure(sheet, layout) {
            out.issues.push(
                Issue::Structural {
                    sheet: sheet.name.clone(),
                    reason,
                }
                .logged(),
            );
            continue;
        }
        let before = out.rows.len();
        for row in layout.first_data_row..=sheet.max_row() {
            if let Some(raw) = read_row(sheet, row, layout) {
                out.rows.push(raw);
            }
        }
        log::debug!(
            "sheet '{}': {} named rows",
            sheet.name,
            out.rows.len() - before
        );
    }
    out
}

fn check_structure(sheet: &Sheet, layout: &SheetLayout) -> Result<(), String> {
    let rows = sheet.max_row();
    let cols = sheet.max_col();
    if rows < layout.first_data_row {
        return Err(format!(
            "{} row(s), need at least {}",
            rows, layout.first_data_row
        ));
    }
    if cols < layout.last_col() {
        return Err(format!(
            "{} column(s), need at least {}",
            cols,
            layout.last_col()
        ));
    }
    Ok(())
}

fn read_row(sheet: &Sheet, row: u32, layout: &SheetLayout) -> Option<RawRow> {
    let name = cell_text(sheet, layout.name_col, row);
    if name.is_empty() {
        return None;
    }
    let unit = cell_text(sheet, layout.unit_col, row);
    let (value, formula) = match sheet.get(layout.value_col, row) {
        Some(cell) => (cell.value.clone(), cell.formula.clone()),
        None => (CellValue::Empty, None),
    };
    Some(RawRow {
        sheet: sheet.name.clone(),
        row,
        name,
        unit,
        value,
        formula,
    })
}

fn cell_text(sheet: &Sheet, col: u32, row: u32) -> String {
    sheet
        .value(col, row)
        .map(|v| v.to_string().trim().to_string())
        .unwrap_or_default()
}
