mod common;

use common::{TestWorkspace, arg, bin, csv_rows};
use predicates::str::contains;

#[test]
fn merge_writes_merged_target_and_change_log() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let output = workspace.path().join("merged.csv");
    let change_log = workspace.path().join("changes.csv");
    let source = format!("supplier={}", arg(&supplier));

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            source.as_str(),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--change-log",
            arg(&change_log),
        ])
        .assert()
        .success();

    let merged = csv_rows(&workspace.read("merged.csv"));
    assert_eq!(merged[0], vec!["SKU", "Name", "Price", "Stock"]);
    assert_eq!(merged[1], vec!["A1", "Shirt", "10", "30"]);
    assert_eq!(merged[2], vec!["B2", "Hat", "5", "40"]);
    assert_eq!(merged[3], vec!["C3", "Sock", "7", "1"]);
    assert_eq!(merged[4], vec!["D4", "Scarf", "", ""]);
    assert_eq!(merged[6], vec!["", "Loose", "", ""]);

    let log = csv_rows(&workspace.read("changes.csv"));
    assert_eq!(log.len(), 4);
    assert_eq!(log[0][0], "row");
    assert_eq!(
        log[1],
        vec!["1", "A1", "Price", "", "10", "filled", "supplier", "1", "1", "fill_if_empty"]
    );
    assert!(log.iter().all(|row| row[5] != "conflict_skipped"));
}

#[test]
fn skipped_columns_are_left_untouched() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let output = workspace.path().join("merged.csv");

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--skip-column",
            "Stock",
        ])
        .assert()
        .success();

    let merged = csv_rows(&workspace.read("merged.csv"));
    assert_eq!(merged[1], vec!["A1", "Shirt", "10", "3"]);
    assert_eq!(merged[2], vec!["B2", "Hat", "5", ""]);
}

#[test]
fn unmatched_log_lists_target_rows_without_a_match() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let output = workspace.path().join("merged.csv");
    let unmatched = workspace.path().join("unmatched.csv");

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--unmatched-log",
            arg(&unmatched),
        ])
        .assert()
        .success();

    let rows = csv_rows(&workspace.read("unmatched.csv"));
    assert_eq!(rows, vec![vec!["row", "key"], vec!["3", "C3"], vec!["6", ""]]);
}

#[test]
fn preview_lists_changes_and_summary() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
        ])
        .assert()
        .success()
        .stdout(contains("filled"))
        .stdout(contains("conflict_skipped"))
        .stdout(contains("Rows matched:     2 (33.3%)"))
        .stdout(contains("Ambiguous keys in 'supplier': d4"))
        .stdout(contains("2 source row(s) unused"));
}

#[test]
fn preview_does_not_modify_the_target() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "--all",
        ])
        .assert()
        .success();

    assert_eq!(workspace.read("target.csv"), common::TARGET_CSV);
}

#[test]
fn typed_target_column_reports_coercion_errors() {
    let workspace = TestWorkspace::new();
    let (target, _, profile) = workspace.standard_inputs();
    let supplier = workspace.write("supplier.csv", "SKU,Price,Stock\nA1,12,many\n");
    let output = workspace.path().join("merged.csv");

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--column-type",
            "Stock=number",
        ])
        .assert()
        .success()
        .stderr(contains("cannot store 'many' as number"));

    let merged = csv_rows(&workspace.read("merged.csv"));
    assert_eq!(merged[1], vec!["A1", "Shirt", "12", "3"]);
}

#[test]
fn missing_target_key_column_fails() {
    let workspace = TestWorkspace::new();
    let (_, supplier, profile) = workspace.standard_inputs();
    let target = workspace.write("target.csv", "EAN,Price\n1,\n");

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
        ])
        .assert()
        .failure()
        .stderr(contains("Column 'SKU' not found in dataset 'target'"));
}

#[test]
fn invalid_profile_is_rejected() {
    let workspace = TestWorkspace::new();
    let profile = workspace.write(
        "broken.yaml",
        "key_columns:\n  - target: SKU\n    source: SKU\nrules:\n  - source_column: Price\n    target_column: Price\n    write_mode: replace_all\n",
    );

    bin()
        .args(["profile", "-p", arg(&profile)])
        .assert()
        .failure()
        .stderr(contains("Invalid mapping profile"));
}

#[test]
fn profile_command_lists_rules() {
    let workspace = TestWorkspace::new();
    let (_, _, profile) = workspace.standard_inputs();

    bin()
        .args(["profile", "-p", arg(&profile)])
        .assert()
        .success()
        .stdout(contains("supplier prices"))
        .stdout(contains("fill_if_empty"))
        .stdout(contains("overwrite"));
}

#[test]
fn keys_command_reports_duplicates_and_detects_key() {
    let workspace = TestWorkspace::new();
    let (target, _, _) = workspace.standard_inputs();

    bin()
        .args(["keys", "-i", arg(&target)])
        .assert()
        .success()
        .stdout(contains("Key columns:     SKU"))
        .stdout(contains("Duplicate keys:  1"))
        .stdout(contains("Empty keys:      1"))
        .stdout(contains("Duplicates:      d4"));
}

#[test]
fn duplicate_source_names_are_rejected() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let spec = format!("supplier={}", arg(&supplier));

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            spec.as_str(),
            "-s",
            spec.as_str(),
            "-p",
            arg(&profile),
        ])
        .assert()
        .failure()
        .stderr(contains("used more than once"));
}

#[test]
fn only_listed_keys_are_merged() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let output = workspace.path().join("merged.csv");

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--only-key",
            "b2",
        ])
        .assert()
        .success();

    let merged = csv_rows(&workspace.read("merged.csv"));
    assert_eq!(merged[1], vec!["A1", "Shirt", "", "3"]);
    assert_eq!(merged[2], vec!["B2", "Hat", "5", "40"]);
}

#[test]
fn row_range_limits_changes_and_unmatched_log() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();
    let output = workspace.path().join("merged.csv");
    let unmatched = workspace.path().join("unmatched.csv");

    bin()
        .args([
            "merge",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "-o",
            arg(&output),
            "--unmatched-log",
            arg(&unmatched),
            "--rows",
            "2-3",
        ])
        .assert()
        .success();

    let merged = csv_rows(&workspace.read("merged.csv"));
    assert_eq!(merged[1], vec!["A1", "Shirt", "", "3"]);
    assert_eq!(merged[2], vec!["B2", "Hat", "5", "40"]);
    let rows = csv_rows(&workspace.read("unmatched.csv"));
    assert_eq!(rows, vec![vec!["row", "key"], vec!["3", "C3"]]);
}

#[test]
fn key_pattern_and_first_restrict_the_preview() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "--key-pattern",
            "^[ab]",
        ])
        .assert()
        .success()
        .stdout(contains("Rows processed:   2"))
        .stdout(contains("Rows matched:     2 (100.0%)"));

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "--first",
            "1",
        ])
        .assert()
        .success()
        .stdout(contains("Rows processed:   1"));
}

#[test]
fn invalid_key_pattern_is_rejected() {
    let workspace = TestWorkspace::new();
    let (target, supplier, profile) = workspace.standard_inputs();

    bin()
        .args([
            "preview",
            "-t",
            arg(&target),
            "-s",
            arg(&supplier),
            "-p",
            arg(&profile),
            "--key-pattern",
            "(",
        ])
        .assert()
        .failure()
        .stderr(contains("invalid key pattern"));
}
