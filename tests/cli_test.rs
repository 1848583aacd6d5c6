//! CLI contract tests
//!
//! Runs the scorekeep binary in a temp project whose plugins are small shell
//! scripts writing audit outputs, and checks the persisted reports.

#![cfg(unix)]

use std::path::Path;
use std::process::Command;

fn scorekeep_bin() -> String {
    env!("CARGO_BIN_EXE_scorekeep").to_string()
}

const CONFIG: &str = r#"
[persist]
format = ["json", "md"]

[[plugins]]
slug = "lint"
title = "Lint"
audits = [
  { slug = "no-any", title = "No any" },
  { slug = "no-console", title = "No console" },
]
runner = { command = "sh", args = ["-c", "mkdir -p tmp && echo '[{\"slug\":\"no-any\",\"value\":2,\"score\":0},{\"slug\":\"no-console\",\"value\":0,\"score\":1}]' > tmp/lint.json"], outputFile = "tmp/lint.json" }

[[plugins.groups]]
slug = "style"
title = "Style"
refs = [
  { slug = "no-any", weight = 3 },
  { slug = "no-console", weight = 1 },
]

[[plugins]]
slug = "tests"
title = "Tests"
audits = [{ slug = "unit", title = "Unit tests" }]
runner = { command = "sh", args = ["-c", "mkdir -p tmp && echo '[{\"slug\":\"unit\",\"value\":1,\"score\":0.5,\"displayValue\":\"1 failed\"}]' > tmp/tests.json"], outputFile = "tmp/tests.json" }

[[categories]]
slug = "quality"
title = "Quality"
refs = [
  { type = "group", plugin = "lint", slug = "style", weight = 1 },
  { type = "audit", plugin = "tests", slug = "unit", weight = 1 },
]
"#;

fn setup_project(config: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    std::fs::write(dir.path().join("scorekeep.toml"), config).expect("write config");
    dir
}

fn run_scorekeep(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(scorekeep_bin())
        .args(args)
        .current_dir(dir)
        .env_remove("SCOREKEEP_SERVER")
        .env_remove("SCOREKEEP_CONFIG")
        .output()
        .expect("Failed to run scorekeep");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    )
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content).expect("Invalid JSON")
}

#[test]
fn test_collect_persists_scored_report() {
    let dir = setup_project(CONFIG);
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect"]);
    assert_eq!(code, 0, "collect failed: {}", stderr);

    let report = read_json(&dir.path().join(".scorekeep/report.json"));
    let plugins = report["plugins"].as_array().unwrap();
    assert_eq!(plugins.len(), 2);
    assert_eq!(plugins[0]["slug"], "lint");
    assert_eq!(plugins[1]["slug"], "tests");

    // style = (0*3 + 1*1) / 4
    let group = &plugins[0]["groups"][0];
    assert_eq!(group["score"].as_f64().unwrap(), 0.25);

    // quality = (0.25 + 0.5) / 2
    let category = &report["categories"][0];
    assert_eq!(category["score"].as_f64().unwrap(), 0.375);

    let md = std::fs::read_to_string(dir.path().join(".scorekeep/report.md")).unwrap();
    assert!(md.contains("# Scorekeep Report"));
    assert!(md.contains("| [Quality](#quality) | 38 |"));
}

#[test]
fn test_default_command_collects() {
    let dir = setup_project(CONFIG);
    let (code, _, stderr) = run_scorekeep(dir.path(), &[]);
    assert_eq!(code, 0, "collect failed: {}", stderr);
    assert!(dir.path().join(".scorekeep/report.json").exists());
}

#[test]
fn test_collect_flags_override_persist() {
    let dir = setup_project(CONFIG);
    let (code, stdout, stderr) = run_scorekeep(
        dir.path(),
        &[
            "collect",
            "--output-dir",
            "out",
            "--filename",
            "nightly",
            "--format",
            "stdout",
        ],
    );
    assert_eq!(code, 0, "collect failed: {}", stderr);
    assert!(dir.path().join("out/nightly.json").exists());
    assert!(!dir.path().join("out/nightly.md").exists());
    assert!(stdout.contains("Lint audits"));
}

#[test]
fn test_only_plugins_runs_subset() {
    let dir = setup_project(CONFIG);
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect", "--only-plugins", "tests"]);
    assert_eq!(code, 0, "collect failed: {}", stderr);

    let report = read_json(&dir.path().join(".scorekeep/report.json"));
    assert_eq!(report["plugins"].as_array().unwrap().len(), 1);
    let refs = report["categories"][0]["refs"].as_array().unwrap();
    assert_eq!(refs.len(), 1);
    assert_eq!(report["categories"][0]["score"].as_f64().unwrap(), 0.5);
}

#[test]
fn test_failing_plugin_exits_nonzero() {
    let config = CONFIG.replace("mkdir -p tmp && echo '[{\\\"slug\\\":\\\"unit\\\"", "exit 3; echo '[{\\\"slug\\\":\\\"unit\\\"");
    assert_ne!(config, CONFIG);
    let dir = setup_project(&config);
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("tests"), "stderr should name the plugin: {}", stderr);
    assert!(!dir.path().join(".scorekeep/report.json").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = setup_project(&CONFIG.replace("slug = \"quality\"", "slug = \"Quality!\""));
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("Quality!"), "stderr: {}", stderr);
}

#[test]
fn test_missing_config() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("scorekeep.toml"));
}

#[test]
fn test_print_config_shows_defaults() {
    let dir = setup_project(CONFIG);
    let (code, stdout, _) = run_scorekeep(dir.path(), &["print-config"]);
    assert_eq!(code, 0);
    let config: serde_json::Value = serde_json::from_str(&stdout).expect("config JSON");
    assert_eq!(config["persist"]["outputDir"], ".scorekeep");
    assert_eq!(config["persist"]["filename"], "report");
    assert_eq!(config["plugins"][0]["runner"]["outputFile"], "tmp/lint.json");
}

#[test]
fn test_compare_writes_diff() {
    let dir = setup_project(CONFIG);
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect", "--filename", "before"]);
    assert_eq!(code, 0, "collect failed: {}", stderr);

    let config = CONFIG.replace(
        "\\\"value\\\":1,\\\"score\\\":0.5,\\\"displayValue\\\":\\\"1 failed\\\"",
        "\\\"value\\\":0,\\\"score\\\":1",
    );
    assert_ne!(config, CONFIG);
    std::fs::write(dir.path().join("scorekeep.toml"), config).unwrap();
    let (code, _, stderr) = run_scorekeep(dir.path(), &["collect", "--filename", "after"]);
    assert_eq!(code, 0, "collect failed: {}", stderr);

    let (code, _, stderr) = run_scorekeep(
        dir.path(),
        &[
            "compare",
            "--before",
            ".scorekeep/before.json",
            "--after",
            ".scorekeep/after.json",
        ],
    );
    assert_eq!(code, 0, "compare failed: {}", stderr);

    let diff = read_json(&dir.path().join(".scorekeep/report-diff.json"));
    assert_eq!(diff["audits"]["changed"][0]["slug"], "unit");
    let md = std::fs::read_to_string(dir.path().join(".scorekeep/report-diff.md")).unwrap();
    assert!(md.contains("| Quality | 38 | 63 | +25 |"), "diff: {}", md);
}
