//! Integration tests for the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

const MODEL: &str = "Name,Unit,Value\n\
                     Rate,%,5\n\
                     Rate,%,5\n\
                     Base,EUR,100\n\
                     Cost,EUR,=C4*C3\n\
                     Total,EUR,=SUM(C4:C5)\n";

fn model() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("model.csv");
    fs::write(&path, MODEL).unwrap();
    (dir, path)
}

fn run(dir: &Path, args: &[&str]) -> (String, String, i32) {
    // An explicit, empty config keeps the tests independent of the user's
    // own config.toml.
    let config = dir.join("config.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let output = Command::new(env!("CARGO_BIN_EXE_paramgrid"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute paramgrid");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);
    (stdout, stderr, exit_code)
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn analyze_writes_the_normalized_copy() {
    let (dir, input) = model();
    let (stdout, _, code) = run(dir.path(), &["analyze", arg(&input)]);
    assert_eq!(code, 0);
    assert!(stdout.contains("parameters: 4 (5 before deduplication)"), "{}", stdout);
    assert!(stdout.contains("Rate_model_r3 => Rate_model_r2"), "{}", stdout);
    assert!(stdout.contains("output:       Total"), "{}", stdout);

    let written = fs::read_to_string(dir.path().join("model_optimized.csv")).unwrap();
    assert!(written.starts_with("Name,Unit,Value,Dependencies,Formula\n"));
    assert!(written.contains("Cost,EUR,=C3*C2,\"Base, Rate\",Base*Rate"));
}

#[test]
fn analyze_honours_output_and_no_write() {
    let (dir, input) = model();
    let out = dir.path().join("clean.csv");

    let (_, _, code) = run(dir.path(), &["analyze", arg(&input), "-o", arg(&out)]);
    assert_eq!(code, 0);
    assert!(out.is_file());

    let (stdout, _, code) = run(dir.path(), &["analyze", arg(&input), "--no-write"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("no output written"));
    assert!(!dir.path().join("model_optimized.csv").exists());
}

#[test]
fn analyze_json_is_parseable() {
    let (dir, input) = model();
    let (stdout, _, code) = run(dir.path(), &["analyze", arg(&input), "--json", "--no-write"]);
    assert_eq!(code, 0);
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["analysis"]["order"].as_array().unwrap().len(), 4);
    assert!(json["output"].is_null());
}

#[test]
fn order_lists_dependencies_first() {
    let (dir, input) = model();
    let (stdout, _, code) = run(dir.path(), &["order", arg(&input)]);
    assert_eq!(code, 0);
    let lines: Vec<&str> = stdout.lines().map(str::trim).collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "1. Rate (Rate_model_r2)");
    assert_eq!(lines[1], "2. Base");
    assert_eq!(lines[2], "3. Cost");
    assert_eq!(lines[3], "4. Total");
    assert!(!dir.path().join("model_optimized.csv").exists());
}

#[test]
fn edges_and_chain() {
    let (dir, input) = model();
    let (stdout, _, code) = run(dir.path(), &["edges", arg(&input)]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|l| l == "Cost -> Base"), "{}", stdout);
    assert!(stdout.lines().any(|l| l == "Total -> Cost"), "{}", stdout);

    let (stdout, _, code) = run(dir.path(), &["chain", arg(&input), "Total"]);
    assert_eq!(code, 0);
    assert!(stdout.starts_with("Total = (unset)\n"), "{}", stdout);
    assert!(stdout.contains("\n  Cost = (unset) EUR\n"), "{}", stdout);
    assert!(stdout.contains("\n    Base = 100 EUR\n"), "{}", stdout);
}

#[test]
fn chain_of_unknown_parameter_fails() {
    let (dir, input) = model();
    let (_, stderr, code) = run(dir.path(), &["chain", arg(&input), "Nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Unknown parameter: Nope"), "{}", stderr);
}

#[test]
fn evaluate_reports_missing_values() {
    let (dir, input) = model();
    let (stdout, _, code) = run(dir.path(), &["evaluate", arg(&input), "--set", "Base=200"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Cost: no value available for 'Cost'"), "{}", stdout);
    assert!(!stdout.contains("Base"), "{}", stdout);

    let (_, stderr, code) = run(dir.path(), &["evaluate", arg(&input), "--set", "Base"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("expected ID=VALUE"), "{}", stderr);
}

#[test]
fn bad_config_is_a_warning() {
    let (dir, input) = model();
    fs::write(dir.path().join("config.toml"), "[layout]\nbogus = 1\n").unwrap();
    let (_, stderr, code) = run(dir.path(), &["order", arg(&input)]);
    assert_eq!(code, 0);
    assert!(stderr.contains("Warning: Failed to parse"), "{}", stderr);
}

#[test]
fn missing_input_fails() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.csv");
    let (_, stderr, code) = run(dir.path(), &["analyze", arg(&missing)]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Failed to analyze"), "{}", stderr);
}
