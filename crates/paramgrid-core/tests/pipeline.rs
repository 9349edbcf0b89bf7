use paramgrid_core::{
    AnalysisOptions, Cell, CellValue, Issue, ParamValue, Role, Sheet, Workbook, analyze_file,
    analyze_workbook,
};
use std::fs;
use tempfile::tempdir;

fn header(sheet: &mut Sheet) {
    sheet.set(1, 1, Cell::new_value(CellValue::Text("Name".into())));
    sheet.set(2, 1, Cell::new_value(CellValue::Text("Unit".into())));
    sheet.set(3, 1, Cell::new_value(CellValue::Text("Value".into())));
}

fn row(sheet: &mut Sheet, row: u32, name: &str, unit: &str, value: Cell) {
    sheet.set(1, row, Cell::new_value(CellValue::Text(name.into())));
    if !unit.is_empty() {
        sheet.set(2, row, Cell::new_value(CellValue::Text(unit.into())));
    }
    sheet.set(3, row, value);
}

#[test]
fn csv_file_is_analyzed_and_rewritten() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("model.csv");
    fs::write(
        &input,
        "Name,Unit,Value\n\
         Rate,%,5\n\
         Rate,%,5\n\
         Base,EUR,100\n\
         Cost,EUR,=C4*C3\n\
         Total,EUR,=SUM(C4:C5)\n",
    )
    .unwrap();

    let report = analyze_file(&input, &AnalysisOptions::default(), None).unwrap();
    let output = report.output.clone().unwrap();
    assert_eq!(output, dir.path().join("model_optimized.csv"));

    let analysis = &report.analysis;
    assert_eq!(
        analysis.deduplication.replacements.get("Rate_model_r3").map(String::as_str),
        Some("Rate_model_r2")
    );
    assert_eq!(analysis.parameters["Cost"].human_formula, "Base*Rate");
    assert_eq!(analysis.classification.role_of("Total"), Some(Role::Output));

    let text = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Name,Unit,Value,Dependencies,Formula");
    assert_eq!(lines[1], "Rate,%,5,,");
    assert_eq!(lines[2], "Base,EUR,100,,");
    assert_eq!(lines[3], "Cost,EUR,=C3*C2,\"Base, Rate\",Base*Rate");
    assert_eq!(lines[4], "Total,EUR,=SUM(C3:C4),\"Base, Cost\",SUM(C4:C5)");
    assert_eq!(lines.len(), 5);
}

#[test]
fn xlsx_file_round_trips_through_the_pipeline() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("model.xlsx");
    let mut data = Sheet::new("Data");
    header(&mut data);
    row(&mut data, 2, "X", "m", Cell::new_value(CellValue::Number(10.0)));
    row(&mut data, 3, "X", "m", Cell::new_value(CellValue::Number(10.0)));
    row(&mut data, 4, "Y", "m", Cell::new_value(CellValue::Number(2.0)));
    let mut calc = Sheet::new("Calc");
    header(&mut calc);
    row(&mut calc, 2, "Area", "m2", Cell::new_formula("Data!C3*Data!C4", CellValue::Number(20.0)));
    Workbook {
        sheets: vec![data, calc],
    }
    .save(&input)
    .unwrap();

    let out = dir.path().join("normalized.xlsx");
    let report = analyze_file(&input, &AnalysisOptions::default(), Some(&out)).unwrap();
    assert_eq!(report.output.as_deref(), Some(out.as_path()));

    let rewritten = Workbook::open(&out).unwrap();
    let data = rewritten.sheet("Data").unwrap();
    assert_eq!(data.value(1, 3), Some(&CellValue::Text("Y".into())));
    assert_eq!(data.max_row(), 3);
    let calc = rewritten.sheet("Calc").unwrap();
    assert_eq!(
        calc.get(3, 2).and_then(|c| c.formula.as_deref()),
        Some("Data!C2*Data!C3")
    );

    // A second pass over the rewritten file finds nothing left to merge and
    // the same dependencies.
    let again = analyze_workbook(&rewritten, &AnalysisOptions::default());
    assert!(again.deduplication.is_empty());
    let deps: Vec<&String> = again.parameters["Area"].dependencies.iter().collect();
    assert_eq!(deps, vec!["X", "Y"]);
}

#[test]
fn surviving_references_never_point_at_replaced_rows() {
    let mut sheet = Sheet::new("S");
    header(&mut sheet);
    row(&mut sheet, 2, "A", "", Cell::new_value(CellValue::Number(1.0)));
    row(&mut sheet, 3, "A", "", Cell::new_value(CellValue::Number(1.0)));
    row(&mut sheet, 4, "B", "", Cell::new_value(CellValue::Number(2.0)));
    row(&mut sheet, 5, "B", "", Cell::new_value(CellValue::Number(2.0)));
    row(&mut sheet, 6, "C", "", Cell::new_formula("C3+C5+C2*C4", CellValue::Empty));
    row(&mut sheet, 7, "D", "", Cell::new_formula("C6-C5", CellValue::Empty));
    let workbook = Workbook {
        sheets: vec![sheet],
    };
    let options = AnalysisOptions::default();
    let analysis = analyze_workbook(&workbook, &options);
    let outcome = paramgrid_core::rewrite_workbook(&workbook, &analysis, &options);
    let sheet = &outcome.workbook.sheets[0];

    assert_eq!(sheet.get(3, 4).and_then(|c| c.formula.as_deref()), Some("C2+C3+C2*C3"));
    assert_eq!(sheet.get(3, 5).and_then(|c| c.formula.as_deref()), Some("C4-C3"));

    let again = analyze_workbook(&outcome.workbook, &options);
    assert!(again.deduplication.replacements.is_empty());
    let c_deps: Vec<&String> = again.parameters["C"].dependencies.iter().collect();
    assert_eq!(c_deps, vec!["A", "B"]);
}

#[test]
fn bad_sheets_and_formulas_do_not_abort_the_pass() {
    let mut tiny = Sheet::new("Tiny");
    tiny.set(1, 1, Cell::new_value(CellValue::Text("only a title".into())));
    let mut sheet = Sheet::new("S");
    header(&mut sheet);
    row(&mut sheet, 2, "A", "", Cell::new_value(CellValue::Number(1.0)));
    row(&mut sheet, 3, "Broken", "", Cell::new_formula("'Other!C2", CellValue::Empty));
    let workbook = Workbook {
        sheets: vec![tiny, sheet],
    };

    let analysis = analyze_workbook(&workbook, &AnalysisOptions::default());
    assert_eq!(analysis.parameters.len(), 2);
    assert!(analysis.parameters["Broken"].human_formula.starts_with("#FORMULA ERROR: "));
    assert_eq!(analysis.parameters["A"].value, ParamValue::Number(1.0));
    assert!(analysis
        .issues
        .iter()
        .any(|i| matches!(i, Issue::Structural { sheet, .. } if sheet == "Tiny")));
    assert!(analysis
        .issues
        .iter()
        .any(|i| matches!(i, Issue::FormulaParse { id, .. } if id == "Broken")));
}

#[test]
fn unreadable_file_is_a_hard_failure() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.xlsx");
    assert!(analyze_file(&missing, &AnalysisOptions::default(), None).is_err());
}
