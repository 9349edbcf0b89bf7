//! XLSX reading and writing through umya-spreadsheet.
//!
//! The output book is built fresh from the in-memory model, so row deletion
//! and reference repair are entirely ours; umya never adjusts formulas.

use std::path::Path;
use umya_spreadsheet::{CellRawValue, reader, writer};

use super::{Cell, CellValue, Sheet, Workbook};
use crate::error::{ParamgridError, Result};

pub fn read_xlsx(path: &Path) -> Result<Workbook> {
    let book = reader::xlsx::read(path)?;
    let mut workbook = Workbook::new();

    for index in 0..book.get_sheet_count() {
        let Some(ws) = book.get_sheet(&index) else {
            continue;
        };
        let mut sheet = Sheet::new(ws.get_name());
        for cell in ws.get_cell_collection() {
            let coord = cell.get_coordinate();
            let col = *coord.get_col_num();
            let row = *coord.get_row_num();
            let cv = cell.get_cell_value();

            let value = convert_raw_value(cv.get_raw_value(), || cv.get_value().to_string());
            let formula = cv.get_formula();
            if cv.is_formula() && !formula.is_empty() {
                sheet.set(col, row, Cell::new_formula(formula, value));
            } else if value != CellValue::Empty {
                sheet.set(col, row, Cell::new_value(value));
            }
        }
        log::debug!("read sheet '{}' ({} rows)", sheet.name, sheet.max_row());
        workbook.sheets.push(sheet);
    }
    Ok(workbook)
}

fn convert_raw_value(raw: &CellRawValue, error_text: impl FnOnce() -> String) -> CellValue {
    match raw {
        CellRawValue::Numeric(n) => CellValue::Number(*n),
        CellRawValue::Bool(b) => CellValue::Bool(*b),
        CellRawValue::String(s) => CellValue::Text(s.to_string()),
        CellRawValue::RichText(rt) => CellValue::Text(rt.get_text().to_string()),
        CellRawValue::Lazy(s) => CellValue::parse_field(s.as_ref()),
        CellRawValue::Error(_) => CellValue::Text(error_text()),
        CellRawValue::Empty => CellValue::Empty,
    }
}

pub fn write_xlsx(workbook: &Workbook, path: &Path) -> Result<()> {
    let mut book = umya_spreadsheet::new_file();

    for (index, sheet) in workbook.sheets.iter().enumerate() {
        let ws = if index == 0 {
            let ws = book
                .get_sheet_by_name_mut("Sheet1")
                .ok_or_else(|| ParamgridError::Sheet {
                    name: sheet.name.clone(),
                    message: "new workbook has no default sheet".to_string(),
                })?;
            ws.set_name(sheet.name.as_str());
            ws
        } else {
            book.new_sheet(sheet.name.as_str())
                .map_err(|message| ParamgridError::Sheet {
                    name: sheet.name.clone(),
                    message: message.to_string(),
                })?
        };

        for ((row, col), cell) in sheet.cells() {
            let (col, row) = (*col, *row);
            {
                let target = ws.get_cell_mut((col, row));
                match (&cell.formula, &cell.value) {
                    (Some(formula), _) => {
                        target.set_formula(formula.as_str());
                    }
                    (None, CellValue::Number(n)) => {
                        target.set_value_number(*n);
                    }
                    (None, CellValue::Bool(b)) => {
                        target.set_value_bool(*b);
                    }
                    (None, CellValue::Text(s)) => {
                        target.set_value(s.as_str());
                    }
                    (None, CellValue::Empty) => {}
                }
            }
            if cell.fill.is_some() || cell.bold {
                let style = ws.get_style_mut((col, row));
                if let Some(fill) = &cell.fill {
                    style.set_background_color(format!("FF{}", fill));
                }
                if cell.bold {
                    style.get_font_mut().set_bold(true);
                }
            }
        }
    }

    writer::xlsx::write(&book, path)?;
    Ok(())
}
