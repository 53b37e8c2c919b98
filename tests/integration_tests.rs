//! Integration tests: library-level evaluation scenarios and CLI smoke tests
//! against run files on disk.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use drive_verdict::core::config::Config;
use drive_verdict::health::grader::{HealthGrader, HealthReading};
use drive_verdict::health::severity::Severity;
use drive_verdict::model::dataset::RunDataset;
use drive_verdict::model::recorder::{RunHeader, RunRecorder};
use drive_verdict::model::results::{EvaluationPolicy, ResultsModel};
use drive_verdict::results::rollup::{SuiteVerdict, TestResult};
use drive_verdict::results::verification::{CheckInput, Outcome};
use drive_verdict::view::query::{RequirementColumn, SortDirection};
use drive_verdict::view::state::{
    self, RowCache, Section, SortColumn, ViewAction, ViewState, VisibleRows,
};

// ──────────────────── fixtures ────────────────────

fn check(requirement: u32, title: &str, value: Value, passed: bool) -> Value {
    json!({
        "title": title,
        "value": value,
        "requirement_id": requirement,
        "outcome": if passed { "passed" } else { "failed" },
    })
}

/// Ten tests: seven pass, two fail, one is skipped.
fn scenario_b_run() -> Value {
    let mut tests = Vec::new();
    for n in 1..=10u32 {
        let test = match n {
            3 | 6 => json!({
                "number": n,
                "title": format!("Test {n}"),
                "steps": [{"title": "measure", "verifications": [
                    check(n, "link width", json!(4), false)
                ]}]
            }),
            9 => json!({"number": n, "title": "Firmware update", "executed": false}),
            _ => json!({
                "number": n,
                "title": format!("Test {n}"),
                "steps": [{"title": "measure", "verifications": [
                    check(n, "link width", json!(8), true)
                ]}]
            }),
        };
        tests.push(test);
    }
    json!({
        "title": "NVMe qualification",
        "run_id": "run-b",
        "model": "ACME 960",
        "tests": tests,
        "health": [
            {"name": "SMART Errors", "group": "G1", "severity": "good"},
            {"name": "PCIe Errors", "group": "G1", "severity": "Suspect"},
            {"name": "Composite Temperature", "group": "G2", "severity": "CRITICAL"}
        ]
    })
}

fn passing_run() -> Value {
    json!({
        "title": "smoke",
        "run_id": "run-ok",
        "tests": [
            {"number": 1, "title": "Identify", "steps": [{"title": "read", "verifications": [
                check(1, "model string", json!("ACME 960"), true),
                check(2, "firmware", json!("1.2.3"), true)
            ]}]},
            {"number": 2, "title": "SMART", "steps": [{"title": "log page", "verifications": [
                check(1, "critical warning", json!(0), true)
            ]}]}
        ],
        "health": [
            {"name": "Media in Read-only", "group": "SMART", "value": "No"},
            {"name": "Percent Throttled", "group": "Thermal", "value": 0}
        ]
    })
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn empty_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, "").unwrap();
    path
}

fn model_of(value: &Value) -> ResultsModel {
    let data = RunDataset::from_json_str(&value.to_string()).unwrap();
    ResultsModel::from_dataset(&data, &Config::default()).unwrap()
}

fn parse_json_line(stdout: &str) -> Value {
    let line = stdout.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON {line:?}: {e}"))
}

// ──────────────────── library scenarios ────────────────────

#[test]
fn health_groups_and_banner_escalate_independently() {
    let model = model_of(&scenario_b_run());
    let health = model.health();
    assert_eq!(health.group("G1").unwrap().severity, Severity::Suspect);
    assert_eq!(health.group("G2").unwrap().severity, Severity::Critical);
    assert_eq!(model.banner().severity, Severity::Critical);
    assert_eq!(model.banner().display_severity(), Severity::Critical);
}

#[test]
fn seven_two_one_suite_fails_with_exact_totals() {
    let model = model_of(&scenario_b_run());
    let suite = model.suite();
    assert_eq!(suite.verdict, SuiteVerdict::Failed);
    let t = suite.summary.tests;
    assert_eq!((t.total, t.pass, t.fail, t.skip), (10, 7, 2, 1));
    assert_eq!(t.aborted, 0);
    assert!(suite.complete);
    assert_eq!(model.test(9).unwrap().result, TestResult::Skipped);
    assert_eq!(model.exit_code(), 1);
}

#[test]
fn requirement_counts_span_tests() {
    let run = json!({"tests": [
        {"number": 1, "title": "a", "steps": [{"title": "s", "verifications": [
            check(1, "first", json!(1), true)
        ]}]},
        {"number": 2, "title": "b", "steps": [
            {"title": "s1", "verifications": [check(1, "second", json!(2), true)]},
            {"title": "s2", "verifications": [check(1, "third", json!(3), false)]}
        ]}
    ]});
    let model = model_of(&run);
    let r1 = model.requirement(1);
    assert_eq!((r1.pass(), r1.fail()), (2, 1));
    assert_eq!(r1.result(), Outcome::Failed);

    let evidence = model.requirement_evidence(1);
    let numbers: Vec<u32> = evidence.iter().map(|r| r.verification.number()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(evidence[2].step_number, 2);

    let unknown = model.requirement(42);
    assert!(!unknown.has_evidence());
    assert_eq!(unknown.result(), Outcome::Passed);
}

#[test]
fn all_missing_banner_reads_good_but_tiles_keep_missing() {
    let run = json!({"health": [
        {"name": "Temperature", "group": "Thermal", "severity": "missing"},
        {"name": "Unlisted counter", "group": "Vendor", "value": "n/a"}
    ]});
    let model = model_of(&run);
    assert_eq!(model.banner().severity, Severity::Missing);
    assert_eq!(model.banner().display_severity(), Severity::Good);
    for group in model.groups() {
        assert_eq!(group.severity, Severity::Missing, "group {}", group.name);
    }

    let mut config = Config::default();
    config.health.missing_banner_as_good = false;
    let data = RunDataset::from_json_str(&run.to_string()).unwrap();
    let strict = ResultsModel::from_dataset(&data, &config).unwrap();
    assert_eq!(strict.banner().display_severity(), Severity::Missing);
}

#[test]
fn contract_violations_are_rejected_with_codes() {
    let bad_label = json!({"health": [{"name": "x", "group": "g", "severity": "amber"}]});
    let data = RunDataset::from_json_str(&bad_label.to_string()).unwrap();
    let err = ResultsModel::from_dataset(&data, &Config::default()).unwrap_err();
    assert_eq!(err.code(), "DV-2001");
    assert!(err.is_contract_violation());

    let dup = json!({"tests": [
        {"number": 4, "title": "a"},
        {"number": 4, "title": "b"}
    ]});
    let data = RunDataset::from_json_str(&dup.to_string()).unwrap();
    let err = ResultsModel::from_dataset(&data, &Config::default()).unwrap_err();
    assert_eq!(err.code(), "DV-2003");

    let err = RunDataset::from_json_str(r#"{"tests": "nope"}"#).unwrap_err();
    assert_eq!(err.code(), "DV-2002");
}

#[test]
fn view_actions_reorder_requirements_without_touching_results() {
    let model = model_of(&scenario_b_run());
    let before = model.clone();
    let cache = RowCache::new(&model);

    let mut view = state::update(
        &ViewState::default(),
        ViewAction::SectionSelected(Section::Requirements),
    );
    view = state::update(
        &view,
        ViewAction::SortRequested(SortColumn::Requirement(RequirementColumn::Fail)),
    );
    view = state::update(
        &view,
        ViewAction::SortRequested(SortColumn::Requirement(RequirementColumn::Fail)),
    );
    assert_eq!(view.requirements_sort.direction, SortDirection::Descending);

    let VisibleRows::Requirements(rows) = state::project(&view, &model, &cache) else {
        panic!("expected requirement rows");
    };
    let ids: Vec<u32> = rows.iter().map(|r| r.number()).collect();
    assert_eq!(&ids[..2], &[3, 6]);
    assert_eq!(ids.len(), 9);
    assert_eq!(model, before);
}

#[test]
fn live_recorder_matches_dataset_evaluation() {
    let recorder = RunRecorder::new(
        RunHeader {
            title: "live".to_string(),
            ..RunHeader::default()
        },
        HealthGrader::from_config(&Config::default().health),
        EvaluationPolicy::default(),
    );
    let sink = recorder.health_sink();
    let sampler = std::thread::spawn(move || {
        sink.submit(&HealthReading::raw("Percent Throttled", "Thermal", "12"))
            .unwrap();
        sink.submit(&HealthReading::raw("Media in Read-only", "SMART", "No"))
            .unwrap();
    });

    recorder.begin_test(1, "Identify", "").unwrap();
    recorder.begin_step("read", "").unwrap();
    recorder
        .record(CheckInput::requirement(1, "model", "ACME", true))
        .unwrap();
    recorder.skip_test(2, "Format", "").unwrap();
    sampler.join().unwrap();

    let model = recorder.publish();
    assert_eq!(model.verdict(), SuiteVerdict::Failed);
    assert_eq!(model.suite().summary.tests.skip, 1);
    assert_eq!(model.health().group("Thermal").unwrap().severity, Severity::Critical);
    assert_eq!(model.health().group("SMART").unwrap().severity, Severity::Good);
}

// ──────────────────── CLI smoke tests ────────────────────

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: dverdict [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    for sub in [
        "evaluate",
        "requirements",
        "tests",
        "verifications",
        "health",
        "config",
        "completions",
    ] {
        let case = format!("subcommand_help_{sub}");
        let result = common::run_cli_case(&case, &[sub, "--help"]);
        assert!(
            result.status.success(),
            "{sub} --help failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn evaluate_passing_run_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &passing_run());
    let result = common::run_cli_case(
        "evaluate_passing_run_exits_zero",
        &[
            "--config",
            config.to_str().unwrap(),
            "--json",
            "evaluate",
            run.to_str().unwrap(),
        ],
    );
    assert_eq!(
        result.status.code(),
        Some(0),
        "log: {}",
        result.log_path.display()
    );
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["verdict"], "PASSED");
    assert_eq!(payload["complete"], true);
    assert_eq!(payload["health"], "good");
    assert_eq!(payload["summary"]["requirements"]["total"], 2);
}

#[test]
fn evaluate_failing_run_exits_one_and_logs_events() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &scenario_b_run());
    let log = dir.path().join("events.jsonl");
    let result = common::run_cli_case(
        "evaluate_failing_run_exits_one_and_logs_events",
        &[
            "--config",
            config.to_str().unwrap(),
            "--log",
            log.to_str().unwrap(),
            "evaluate",
            run.to_str().unwrap(),
        ],
    );
    assert_eq!(
        result.status.code(),
        Some(1),
        "log: {}",
        result.log_path.display()
    );

    // Piped stdout defaults to JSON.
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["verdict"], "FAILED");
    assert_eq!(payload["summary"]["tests"]["total"], 10);
    assert_eq!(payload["summary"]["tests"]["skip"], 1);

    let lines: Vec<Value> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["event"], "config_loaded");
    let last = lines.last().unwrap();
    assert_eq!(last["event"], "run_evaluated");
    assert_eq!(last["result"], "FAILED");
    assert_eq!(last["tests"], json!([10, 7, 2, 1]));
    assert!(lines.iter().any(|l| l["event"] == "health_escalated" && l["group"] == "G2"));
}

#[test]
fn evaluate_human_output_names_the_verdict() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &scenario_b_run());
    let result = common::run_cli_case_with_env(
        "evaluate_human_output_names_the_verdict",
        &[
            "--config",
            config.to_str().unwrap(),
            "--no-color",
            "evaluate",
            run.to_str().unwrap(),
        ],
        &[("DV_OUTPUT_FORMAT", "human")],
    );
    assert_eq!(result.status.code(), Some(1));
    assert!(
        result.stdout.contains("verdict:       FAILED"),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stdout.contains("10 total, 7 passed, 2 failed, 1 skipped"));
    assert!(result.stdout.contains("health:        critical"));
}

#[test]
fn unknown_severity_label_is_rejected_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(
        dir.path(),
        "bad.json",
        &json!({"health": [{"name": "x", "group": "g", "severity": "amber"}]}),
    );
    let log = dir.path().join("events.jsonl");
    let result = common::run_cli_case(
        "unknown_severity_label_is_rejected_and_logged",
        &[
            "--config",
            config.to_str().unwrap(),
            "--log",
            log.to_str().unwrap(),
            "evaluate",
            run.to_str().unwrap(),
        ],
    );
    assert_eq!(
        result.status.code(),
        Some(2),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stderr.contains("DV-2001"));
    let text = fs::read_to_string(&log).unwrap();
    assert!(text.contains("\"ingest_rejected\""));
    assert!(text.contains("DV-2001"));
}

#[test]
fn missing_run_file_is_runtime_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let missing = dir.path().join("nope.json");
    let result = common::run_cli_case(
        "missing_run_file_is_runtime_error",
        &[
            "--config",
            config.to_str().unwrap(),
            "evaluate",
            missing.to_str().unwrap(),
        ],
    );
    assert_eq!(result.status.code(), Some(3));
    assert!(result.stderr.contains("DV-3002"));
}

#[test]
fn requirements_command_sorts_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &scenario_b_run());
    let result = common::run_cli_case(
        "requirements_command_sorts_and_filters",
        &[
            "--config",
            config.to_str().unwrap(),
            "requirements",
            run.to_str().unwrap(),
            "--sort",
            "result",
            "--desc",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["sort"], "result");
    let rows = payload["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 9);
    assert_eq!(rows[0]["result"], "failed");
    assert_eq!(rows[0]["number"], 3);
    assert_eq!(rows[1]["number"], 6);

    let single = common::run_cli_case(
        "requirements_command_single",
        &[
            "--config",
            config.to_str().unwrap(),
            "requirements",
            run.to_str().unwrap(),
            "--id",
            "77",
        ],
    );
    assert!(single.status.success());
    let payload = parse_json_line(&single.stdout);
    assert_eq!(payload["has_evidence"], false);
    assert_eq!(payload["evidence"].as_array().unwrap().len(), 0);
}

#[test]
fn verifications_command_follows_requirement_selection() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &passing_run());
    let result = common::run_cli_case(
        "verifications_command_follows_requirement_selection",
        &[
            "--config",
            config.to_str().unwrap(),
            "verifications",
            run.to_str().unwrap(),
            "--requirement",
            "1",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    let rows = payload["rows"].as_array().unwrap();
    let tests: Vec<u64> = rows
        .iter()
        .map(|r| r["test_number"].as_u64().unwrap())
        .collect();
    assert_eq!(tests, vec![1, 2]);
}

#[test]
fn health_command_reports_tiles_and_banner() {
    let dir = tempfile::tempdir().unwrap();
    let config = empty_config(dir.path());
    let run = write_json(dir.path(), "run.json", &scenario_b_run());
    let result = common::run_cli_case(
        "health_command_reports_tiles_and_banner",
        &[
            "--config",
            config.to_str().unwrap(),
            "health",
            run.to_str().unwrap(),
            "--parameters",
            "--sort",
            "severity",
            "--desc",
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["banner"], "critical");
    assert_eq!(payload["groups"][0]["name"], "G1");
    assert_eq!(payload["groups"][0]["severity"], "suspect");
    assert_eq!(payload["parameters"][0]["name"], "Composite Temperature");
}

#[test]
fn config_command_reports_hash() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[rollup]\nskipped_fails_suite = false\n").unwrap();
    let result = common::run_cli_case(
        "config_command_reports_hash",
        &["--config", config.to_str().unwrap(), "--json", "config"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["config"]["rollup"]["skipped_fails_suite"], false);
    assert!(payload["hash"].as_str().is_some_and(|h| !h.is_empty()));
}

#[test]
fn invalid_config_is_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[query]\ndefault_sort_column = \"colour\"\n").unwrap();
    let result = common::run_cli_case(
        "invalid_config_is_user_error",
        &["--config", config.to_str().unwrap(), "config"],
    );
    assert_eq!(result.status.code(), Some(2));
    assert!(result.stderr.contains("DV-1001"));
}

#[test]
fn completions_generate_for_bash() {
    let result = common::run_cli_case("completions_generate_for_bash", &["completions", "bash"]);
    assert!(result.status.success());
    assert!(result.stdout.contains("dverdict"));
}
