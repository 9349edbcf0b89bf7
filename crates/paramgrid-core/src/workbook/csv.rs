//! CSV reading and writing. A CSV file is a one-sheet workbook named after
//! the file stem; fields beginning with `=` are formulas.

use std::fs::File;
use std::path::Path;

use super::{Cell, CellValue, Sheet, Workbook};
use crate::error::Result;

pub fn read_csv(path: &Path) -> Result<Workbook> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        // Ragged rows are common in hand-edited parameter lists.
        .flexible(true)
        .from_reader(file);

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Sheet1");
    let mut sheet = Sheet::new(name);

    for (row_idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = row_idx as u32 + 1;
        for (col_idx, field) in record.iter().enumerate() {
            let col = col_idx as u32 + 1;
            if let Some(cell) = parse_csv_field(field) {
                sheet.set(col, row, cell);
            }
        }
    }

    Ok(Workbook {
        sheets: vec![sheet],
    })
}

fn parse_csv_field(field: &str) -> Option<Cell> {
    if field.starts_with('=') && field.len() > 1 {
        return Some(Cell::new_formula(field, CellValue::Empty));
    }
    match CellValue::parse_field(field) {
        CellValue::Empty => None,
        value => Some(Cell::new_value(value)),
    }
}

/// Write the first sheet. CSV has no room for more, nor for fills.
pub fn write_csv(workbook: &Workbook, path: &Path) -> Result<()> {
    if workbook.sheets.len() > 1 {
        log::warn!(
            "CSV output holds one sheet; writing '{}' and dropping {} more",
            workbook.sheets[0].name,
            workbook.sheets.len() - 1
        );
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)?;

    if let Some(sheet) = workbook.sheets.first() {
        let max_col = sheet.max_col();
        for row in 1..=sheet.max_row() {
            let record: Vec<String> = (1..=max_col)
                .map(|col| match sheet.get(col, row) {
                    Some(Cell {
                        formula: Some(formula),
                        ..
                    }) => format!("={}", formula),
                    Some(cell) => cell.value.to_string(),
                    None => String::new(),
                })
                .collect();
            writer.write_record(&record)?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_read_csv_detects_formulas_and_numbers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("budget.csv");
        fs::write(&path, "Name,Unit,Value\nA,,5\nB,kg,=C2*2\n").unwrap();

        let workbook = read_csv(&path).unwrap();
        let sheet = &workbook.sheets[0];
        assert_eq!(sheet.name, "budget");
        assert_eq!(sheet.value(3, 2), Some(&CellValue::Number(5.0)));
        assert_eq!(sheet.get(3, 3).unwrap().formula.as_deref(), Some("C2*2"));
        assert_eq!(sheet.get(2, 2), None);
    }

    #[test]
    fn test_write_csv_restores_formula_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut sheet = Sheet::new("out");
        sheet.set(1, 1, Cell::new_value(CellValue::Text("A".into())));
        sheet.set(3, 1, Cell::new_value(CellValue::Number(10.0)));
        sheet.set(3, 2, Cell::new_formula("C1+1", CellValue::Number(11.0)));
        let workbook = Workbook {
            sheets: vec![sheet],
        };

        write_csv(&workbook, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "A,,10\n,,=C1+1\n");
    }
}
