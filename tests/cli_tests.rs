use std::path::Path;

use assert_cmd::Command;
use dispatchbench::{
    BaselineRecord,
    baseline::{BASELINE_FILE_ENV, DEFAULT_BASELINE_FILE},
};

const QUICK: [&str; 2] = ["--pb-samples=1", "--pb-iters=1000"];

fn write_baseline(path: &Path, ns: f64) {
    let records: Vec<BaselineRecord> = ["virtual_setter", "std_func_setter", "msg_setter"]
        .iter()
        .map(|case| BaselineRecord::new("setter", case, ns))
        .collect();
    std::fs::write(path, serde_json::to_vec(&records).unwrap()).unwrap();
}

fn bench() -> Command {
    Command::new(env!("CARGO_BIN_EXE_dispatchbench"))
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_cli_help_exits_successfully() {
    bench().arg("--pb-help").assert().success();
}

#[test]
fn test_cli_usage_error_exits_with_two() {
    bench().arg("--pb-samples=0").assert().code(2);
    bench().arg("--unknown").assert().code(2);
}

#[test]
fn test_cli_prints_report_without_regression() {
    let output = bench().args(QUICK).output().unwrap();
    assert!(output.status.success());
    let stdout = stdout_of(&output);
    assert!(stdout.contains("msg_setter"));
    assert!(stdout.contains("std_func_noop *"));
}

#[test]
fn test_cli_regression_passes_against_generous_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    write_baseline(&path, 1e9);
    let output = bench()
        .args(QUICK)
        .arg(format!("--baseline-file={}", path.display()))
        .arg("--test-perf-regression")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("setter/msg_setter: ok"));
}

#[test]
fn test_cli_regression_failure_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    write_baseline(&path, 0.0);
    bench()
        .args(QUICK)
        .args(["--tolerance=0", "--check=setter/msg_setter"])
        .arg(format!("--baseline-file={}", path.display()))
        .arg("--test-perf-regression")
        .assert()
        .code(1);
}

#[test]
fn test_cli_unknown_pair_is_a_lookup_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    write_baseline(&path, 1e9);
    let output = bench()
        .args(QUICK)
        .arg("--check=setter/never_registered")
        .arg(format!("--baseline-file={}", path.display()))
        .arg("--test-perf-regression")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout_of(&output).contains("Performance regression test error"));
}

#[test]
fn test_cli_missing_baseline_file_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    bench()
        .args(QUICK)
        .arg(format!("--baseline-file={}", path.display()))
        .arg("--test-perf-regression")
        .assert()
        .code(1);
}

#[test]
fn test_cli_json_format() {
    let output = bench()
        .args(QUICK)
        .args(["--pb-format=json", "--pb-suite=noop"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(parsed["suites"].as_array().unwrap().len(), 1);
}

#[test]
fn test_cli_baseline_file_from_environment() {
    let dir = tempfile::tempdir().unwrap();
    let env_path = dir.path().join("from_env.json");
    write_baseline(&env_path, 1e9);
    // A default file that would fail shows the environment path wins.
    write_baseline(&dir.path().join(DEFAULT_BASELINE_FILE), 0.0);
    let output = bench()
        .current_dir(dir.path())
        .env(BASELINE_FILE_ENV, &env_path)
        .args(QUICK)
        .args(["--tolerance=0", "--test-perf-regression"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("setter/msg_setter: ok"));
}

#[test]
fn test_cli_baseline_file_defaults_to_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_baseline(&dir.path().join(DEFAULT_BASELINE_FILE), 1e9);
    let output = bench()
        .current_dir(dir.path())
        .env_remove(BASELINE_FILE_ENV)
        .args(QUICK)
        .arg("--test-perf-regression")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(stdout_of(&output).contains("setter/msg_setter: ok"));

    let empty = tempfile::tempdir().unwrap();
    bench()
        .current_dir(empty.path())
        .env_remove(BASELINE_FILE_ENV)
        .args(QUICK)
        .arg("--test-perf-regression")
        .assert()
        .code(1);
}

#[test]
fn test_cli_json_format_keeps_verdicts_off_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("baseline.json");
    write_baseline(&path, 1e9);
    let output = bench()
        .args(QUICK)
        .arg("--pb-format=json")
        .arg(format!("--baseline-file={}", path.display()))
        .arg("--test-perf-regression")
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value = serde_json::from_str(&stdout_of(&output)).unwrap();
    assert_eq!(parsed["suites"].as_array().unwrap().len(), 2);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("setter/msg_setter: ok"));
}
