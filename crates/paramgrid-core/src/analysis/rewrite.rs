//! Rewriter: produces the normalized workbook.
//!
//! Order matters: annotate and append the description columns while rows
//! still sit at their original positions, then delete replaced rows from the
//! bottom up, then repair every formula against the recorded shifts.

use indexmap::IndexMap;
use paramgrid_engine::engine::{
    CellRef, CellToken, Formula, RangeToken, Retarget, RetargetMap, RowShift, Segment,
    rewrite_references,
};

use super::Analysis;
use crate::error::Issue;
use crate::ids::SheetNames;
use crate::options::AnalysisOptions;
use crate::param::Parameter;
use crate::workbook::{Cell, CellValue, Sheet, Workbook};

pub const DEPENDENCIES_HEADER: &str = "Dependencies";
pub const FORMULA_HEADER: &str = "Formula";

#[derive(Clone, Debug, Default)]
pub struct RewriteOutcome {
    pub workbook: Workbook,
    pub shifts: RowShift,
    pub issues: Vec<Issue>,
}

pub fn rewrite_workbook(source: &Workbook, analysis: &Analysis, options: &AnalysisOptions) -> RewriteOutcome {
    let mut workbook = source.clone();

    annotate(&mut workbook, analysis, options);
    append_descriptions(&mut workbook, analysis, options);
    let shifts = delete_replaced_rows(&mut workbook, analysis);
    let retargets = build_retargets(analysis, &shifts);
    let issues = repair_formulas(&mut workbook, &retargets, &shifts);

    log::info!(
        "rewrite: {} row(s) deleted, {} formula(s) left unchanged",
        analysis.deduplication.replacements.len(),
        issues.len()
    );
    RewriteOutcome {
        workbook,
        shifts,
        issues,
    }
}

fn fill_for<'a>(param: &Parameter, analysis: &Analysis, options: &'a AnalysisOptions) -> Option<&'a str> {
    let palette = &options.palette;
    let c = &analysis.classification;
    if analysis.deduplication.replacements.contains_key(&param.id) {
        Some(palette.replaced.as_str())
    } else if param.has_cycle {
        Some(palette.circular.as_str())
    } else if c.input.contains(&param.id) {
        Some(palette.input.as_str())
    } else if c.intermediate.contains(&param.id) {
        Some(palette.intermediate.as_str())
    } else if c.output.contains(&param.id) {
        Some(palette.output.as_str())
    } else {
        None
    }
}

/// Fill the parameter columns by role and write renamed names back.
fn annotate(workbook: &mut Workbook, analysis: &Analysis, options: &AnalysisOptions) {
    let layout = &options.layout;
    for param in analysis.original.values() {
        let Some(sheet) = workbook.sheet_mut(&param.sheet) else {
            continue;
        };
        let current = analysis.parameters.get(&param.id).unwrap_or(param);
        if let Some(fill) = fill_for(current, analysis, options) {
            for col in layout.columns() {
                sheet.get_mut(col, param.row).fill = Some(fill.to_string());
            }
        }
        if current.name != param.name {
            sheet.set_value(layout.name_col, param.row, CellValue::Text(current.name.clone()));
        }
    }
}

/// Append the dependency and human formula columns after each sheet's last
/// used column.
fn append_descriptions(workbook: &mut Workbook, analysis: &Analysis, options: &AnalysisOptions) {
    let header_row = options.layout.header_row();
    let mut by_sheet: IndexMap<&str, Vec<&Parameter>> = IndexMap::new();
    for param in analysis.parameters.values() {
        by_sheet.entry(param.sheet.as_str()).or_default().push(param);
    }

    for (sheet_name, params) in by_sheet {
        let Some(sheet) = workbook.sheet_mut(sheet_name) else {
            continue;
        };
        let dep_col = sheet.max_col() + 1;
        let formula_col = dep_col + 1;
        if header_row > 0 {
            set_header(sheet, dep_col, header_row, DEPENDENCIES_HEADER);
            set_header(sheet, formula_col, header_row, FORMULA_HEADER);
        }
        for param in params {
            if !param.dependency_names.is_empty() {
                let names: Vec<&str> = param.dependency_names.iter().map(String::as_str).collect();
                sheet.set_value(dep_col, param.row, CellValue::Text(names.join(", ")));
            }
            if !param.human_formula.is_empty() {
                sheet.set_value(formula_col, param.row, CellValue::Text(param.human_formula.clone()));
            }
        }
    }
}

fn set_header(sheet: &mut Sheet, col: u32, row: u32, title: &str) {
    sheet.set(
        col,
        row,
        Cell {
            value: CellValue::Text(title.to_string()),
            bold: true,
            ..Cell::default()
        },
    );
}

/// Delete every replaced row, highest row first per sheet.
fn delete_replaced_rows(workbook: &mut Workbook, analysis: &Analysis) -> RowShift {
    let mut rows: IndexMap<&str, Vec<u32>> = IndexMap::new();
    for id in analysis.deduplication.replacements.keys() {
        if let Some(param) = analysis.original.get(id) {
            rows.entry(param.sheet.as_str()).or_default().push(param.row);
        }
    }

    let mut shifts = RowShift::new();
    for (sheet_name, mut sheet_rows) in rows {
        let Some(sheet) = workbook.sheet_mut(sheet_name) else {
            continue;
        };
        sheet_rows.sort_unstable_by(|a, b| b.cmp(a));
        sheet_rows.dedup();
        for row in sheet_rows {
            sheet.delete_row(row);
            shifts.record_deletion(sheet_name, row);
            log::debug!("deleted {}!row {}", sheet_name, row);
        }
    }
    shifts
}

/// Original location of each replaced row -> canonical's post-deletion row.
fn build_retargets(analysis: &Analysis, shifts: &RowShift) -> RetargetMap {
    let mut retargets = RetargetMap::new();
    for (replaced, canonical) in &analysis.deduplication.replacements {
        let (Some(from), Some(to)) = (analysis.original.get(replaced), analysis.original.get(canonical)) else {
            continue;
        };
        let Some(row) = shifts.shifted_row(&to.sheet, to.row) else {
            continue;
        };
        retargets.insert(
            &from.sheet,
            from.row,
            Retarget {
                sheet: to.sheet.clone(),
                row,
            },
        );
    }
    retargets
}

/// Rewrite every formula cell on every sheet. A formula that cannot be
/// tokenized is left as it is and reported.
fn repair_formulas(workbook: &mut Workbook, retargets: &RetargetMap, shifts: &RowShift) -> Vec<Issue> {
    if shifts.is_empty() && retargets.is_empty() {
        return Vec::new();
    }
    let sheet_names: SheetNames = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    let mut issues = Vec::new();

    for sheet in &mut workbook.sheets {
        let anchor = sheet.name.clone();
        for ((row, col), cell) in sheet.cells_mut() {
            let Some(text) = &cell.formula else {
                continue;
            };
            match Formula::parse(text) {
                Ok(formula) => {
                    let formula = canonical_qualifiers(&formula, &sheet_names);
                    let repaired = rewrite_references(&formula, &anchor, retargets, shifts).to_string();
                    if &repaired != text {
                        cell.formula = Some(repaired);
                    }
                }
                Err(err) => {
                    issues.push(
                        Issue::Rewrite {
                            sheet: anchor.clone(),
                            cell: CellRef::new(*col, *row).to_string(),
                            message: err.to_string(),
                        }
                        .logged(),
                    );
                }
            }
        }
    }
    issues
}

/// Spell sheet qualifiers the way the workbook does, so shifts recorded
/// under a sheet's real name also apply to `'base data'!C3`.
fn canonical_qualifiers(formula: &Formula, sheet_names: &SheetNames) -> Formula {
    let spell = |sheet: &Option<String>| -> Option<String> {
        let name = sheet.as_deref()?;
        Some(sheet_names.resolve(name).unwrap_or(name).to_string())
    };
    formula.map_references(
        |cell| {
            Segment::Cell(CellToken {
                sheet: spell(&cell.sheet),
                point: cell.point,
            })
        },
        |range| {
            Segment::Range(RangeToken {
                sheet: spell(&range.sheet),
                start: range.start,
                end: range.end,
            })
        },
    )
}
