// Binary tests for `squadval`: exit codes, stdout contracts, written files.
//
// Run with: cargo test -p squadval-cli --test cli_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

const FIXTURE_CONFIG: &str = "../merge/tests/fixtures/valencia/valencia.merge.toml";

fn squadval() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_squadval"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("SQUADVAL_LOG");
    cmd
}

fn run(args: &[&str]) -> Output {
    squadval().args(args).output().expect("squadval")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "exit code: {:?}\nstderr: {}",
        output.status,
        stderr(output)
    );
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {}\nstdout:\n{}", e, trimmed)
    })
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("bad.merge.toml");
    std::fs::write(&path, body).unwrap();
    path
}

// ===========================================================================
// squadval run
// ===========================================================================

#[test]
fn run_json_is_single_report() {
    let output = run(&["run", FIXTURE_CONFIG, "--json"]);
    assert_success(&output);

    let report = assert_single_json(&output);
    assert_eq!(report["meta"]["config_name"], "Valencia CF");
    assert_eq!(report["rows"], 13);
    assert_eq!(report["matching"]["exact"], 4);
    assert_eq!(report["matching"]["fuzzy"], 2);
    assert_eq!(report["matching"]["scope_warnings"][0], "2425");

    let err = stderr(&output);
    assert!(err.contains("Valencia CF: 13 rows"), "stderr: {err}");
    assert!(err.contains("warning: no valuation rows for season(s) 2425"), "stderr: {err}");
}

#[test]
fn run_without_json_keeps_stdout_empty() {
    let output = run(&["run", FIXTURE_CONFIG]);
    assert_success(&output);
    assert!(output.stdout.is_empty());
    assert!(stderr(&output).contains("diagnostics: 7 of 13 rows"));
}

#[test]
fn run_writes_csv_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("merged.csv");
    let json = dir.path().join("report.json");

    let output = run(&[
        "run",
        FIXTURE_CONFIG,
        "--csv",
        csv.to_str().unwrap(),
        "--output",
        json.to_str().unwrap(),
    ]);
    assert_success(&output);

    let text = std::fs::read_to_string(&csv).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("Player,Season,Nation,Nationality,Pos,Position,Age"));
    assert!(header.ends_with("MarketValueEuro,Current club"));
    assert_eq!(text.lines().count(), 14);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(report["columns"], 16);
}

#[test]
fn threshold_flag_overrides_config() {
    let output = run(&["run", FIXTURE_CONFIG, "--json", "--threshold", "95"]);
    assert_success(&output);
    let report = assert_single_json(&output);
    assert_eq!(report["meta"]["threshold"], 95);
    assert_eq!(report["matching"]["fuzzy"], 0);
}

#[test]
fn threshold_out_of_range_is_usage_error() {
    let output = run(&["run", FIXTURE_CONFIG, "--threshold", "101"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn row_filters_apply() {
    let output = run(&["run", FIXTURE_CONFIG, "--json", "--drop-synthetic", "--only-valued"]);
    assert_success(&output);
    let report = assert_single_json(&output);
    assert_eq!(report["rows"], 6);
    assert_eq!(report["diagnostics"]["total_unvalued"], 0);
}

#[test]
fn no_diagnostics_omits_section() {
    let output = run(&["run", FIXTURE_CONFIG, "--json", "--no-diagnostics"]);
    assert_success(&output);
    let report = assert_single_json(&output);
    assert!(report.get("diagnostics").is_none());
}

#[test]
fn strict_fails_on_unresolved_rows() {
    let output = run(&["run", FIXTURE_CONFIG, "--strict"]);
    assert_eq!(output.status.code(), Some(6), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("error: 1 unresolved row(s)"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

#[test]
fn strict_passes_when_unvalued_rows_are_filtered() {
    let output = run(&["run", FIXTURE_CONFIG, "--strict", "--only-valued"]);
    assert_success(&output);
}

#[test]
fn invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        "name = \"x\"\nseasons = [\"2324\"]\n\n[stats]\ndir = \"fbref\"\n\
         categories = [\"player_shooting\"]\n\n[valuation]\nfile = \"tm.csv\"\n",
    );
    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("base category 'player_stats' is not in categories"));
}

#[test]
fn repeated_season_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        "name = \"x\"\nseasons = [\"2324\", \"2023\"]\n\n[stats]\ndir = \"fbref\"\n\
         categories = [\"player_stats\"]\n\n[valuation]\nfile = \"tm.csv\"\n",
    );
    let output = run(&["validate", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("season '2324' is listed twice"));
}

#[test]
fn missing_config_is_usage_error() {
    let output = run(&["run", "does/not/exist.merge.toml"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("cannot read config"));
}

#[test]
fn missing_inputs_exit_4() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        "name = \"x\"\nseasons = [\"2324\"]\n\n[stats]\ndir = \"fbref\"\n\
         categories = [\"player_stats\"]\n\n[valuation]\nfile = \"tm.csv\"\n",
    );
    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("no data found for category 'player_stats'"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
}

// ===========================================================================
// squadval validate / diagnose / season
// ===========================================================================

#[test]
fn validate_counts_season_files() {
    let output = run(&["validate", FIXTURE_CONFIG]);
    assert_success(&output);
    let err = stderr(&output);
    assert!(err.contains("Valencia CF: 3 season(s), 3 categories, threshold 85 (token_sort)"));
    assert!(err.contains("player_stats: 3/3 season file(s)"), "stderr: {err}");
    assert!(err.contains("player_shooting: 2/3 season file(s)"), "stderr: {err}");
}

#[test]
fn diagnose_reads_merged_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("merged.csv");
    assert_success(&run(&["run", FIXTURE_CONFIG, "--csv", csv.to_str().unwrap()]));

    let output = run(&["diagnose", csv.to_str().unwrap(), "--json"]);
    assert_success(&output);
    let out = assert_single_json(&output);
    assert_eq!(out["diagnostics"]["total_rows"], 13);
    assert_eq!(out["diagnostics"]["total_unvalued"], 7);
    assert_eq!(out["multi_season_players"].as_array().unwrap().len(), 4);

    let output = run(&["diagnose", csv.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("unresolved: Cristhian Mosquera"), "stdout: {stdout}");
}

#[test]
fn diagnose_rejects_missing_value_column() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("plain.csv");
    std::fs::write(&csv, "Player,Season\nHugo Duro,2324\n").unwrap();
    let output = run(&["diagnose", csv.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn diagnose_rejects_wide_rows() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("wide.csv");
    std::fs::write(&csv, "Player,Season,MarketValueEuro\nHugo Duro,2324,,EXTRA\n").unwrap();
    let output = run(&["diagnose", csv.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5));
    let err = stderr(&output);
    assert!(err.contains("row 0: expected 3 field(s), found 4"), "stderr: {err}");
}

#[test]
fn season_prints_codes() {
    let output = run(&["season", "2023", "2023-2024", "2022/23", "2425"]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["2023\t2324", "2023-2024\t2324", "2022/23\t2223", "2425\t2425"]);
}

#[test]
fn no_subcommand_prints_usage() {
    let output = run(&[]);
    assert_success(&output);
    assert!(stderr(&output).contains("Usage: squadval <command>"));
}
