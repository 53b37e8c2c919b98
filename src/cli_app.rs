//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{ColoredString, Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use drive_verdict::core::config::Config;
use drive_verdict::core::errors::DvError;
use drive_verdict::health::severity::Severity;
use drive_verdict::logger::evaluation;
use drive_verdict::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, LogLevel};
use drive_verdict::model::dataset::RunDataset;
use drive_verdict::model::results::ResultsModel;
use drive_verdict::view::query::{
    Column, ParameterColumn, RequirementColumn, SortDirection, TestColumn, VerificationColumn,
};
use drive_verdict::view::state::{
    self, RowCache, Section, SortColumn, SortState, ViewAction, ViewState, VisibleRows,
};

/// Drive Verdict: turns a recorded storage test run into verdicts and health grades.
#[derive(Debug, Parser)]
#[command(
    name = "dverdict",
    author,
    version,
    about = "Drive Verdict - test result and device health aggregation",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Append evaluation events to this JSONL file.
    #[arg(long, global = true, value_name = "PATH")]
    log: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Evaluate a run and exit 0 on a passing verdict, 1 otherwise.
    Evaluate(RunArgs),
    /// List requirements with pass/fail counts.
    Requirements(RequirementsArgs),
    /// List test cases with their results.
    Tests(TestsArgs),
    /// List individual verifications.
    Verifications(VerificationsArgs),
    /// Show health group tiles and the system banner.
    Health(HealthArgs),
    /// Print the effective configuration.
    Config,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Run dataset (JSON).
    #[arg(value_name = "RUN.json")]
    run: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    /// Case-insensitive text filter.
    #[arg(long, value_name = "TEXT", default_value = "")]
    filter: String,
    /// Sort descending.
    #[arg(long)]
    desc: bool,
}

#[derive(Debug, Clone, Args)]
struct RequirementsArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    list: ListArgs,
    /// Sort column: number, title, pass, fail, result.
    #[arg(long, value_name = "COLUMN")]
    sort: Option<RequirementColumn>,
    /// Show one requirement and the verifications behind it.
    #[arg(long, value_name = "ID")]
    id: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct TestsArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    list: ListArgs,
    /// Sort column: number, title, result, failures.
    #[arg(long, value_name = "COLUMN")]
    sort: Option<TestColumn>,
}

#[derive(Debug, Clone, Args)]
struct VerificationsArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    list: ListArgs,
    /// Sort column: number, title, value, requirement, result.
    #[arg(long, value_name = "COLUMN")]
    sort: Option<VerificationColumn>,
    /// Only verifications of this test case.
    #[arg(long, value_name = "NUMBER", conflicts_with = "requirement")]
    test: Option<u32>,
    /// Only verifications against this requirement.
    #[arg(long, value_name = "ID")]
    requirement: Option<u32>,
}

#[derive(Debug, Clone, Args)]
struct HealthArgs {
    #[command(flatten)]
    run: RunArgs,
    #[command(flatten)]
    list: ListArgs,
    /// List individual parameters, sorted by this column: name, group, value, severity.
    #[arg(long, value_name = "COLUMN")]
    sort: Option<ParameterColumn>,
    /// List individual parameters.
    #[arg(long)]
    parameters: bool,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
///
/// Exit code 1 is reserved for a failing verdict, so errors start at 2.
#[derive(Debug, Error)]
pub enum CliError {
    /// Bad input: configuration or run data that breaks the contract.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Engine-side serialization failed (config hash, rendering).
    #[error("{0}")]
    Serialization(String),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 2,
            Self::Runtime(_) | Self::Io(_) => 3,
            Self::Json(_) | Self::Serialization(_) => 4,
        }
    }
}

impl From<DvError> for CliError {
    fn from(err: DvError) -> Self {
        if matches!(err, DvError::Serialization { .. }) {
            Self::Serialization(err.to_string())
        } else if err.is_retryable() {
            Self::Runtime(err.to_string())
        } else {
            Self::User(err.to_string())
        }
    }
}

/// Dispatch CLI commands. Returns the process exit code on success.
pub fn run(cli: &Cli) -> Result<i32, CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Evaluate(args) => run_evaluate(cli, args),
        Command::Requirements(args) => run_requirements(cli, args).map(|()| 0),
        Command::Tests(args) => run_tests(cli, args).map(|()| 0),
        Command::Verifications(args) => run_verifications(cli, args).map(|()| 0),
        Command::Health(args) => run_health(cli, args).map(|()| 0),
        Command::Config => run_config(cli).map(|()| 0),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(0)
        }
    }
}

// ──────────────────── shared plumbing ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Ok(Config::load(cli.config.as_deref())?)
}

/// Event log for this invocation, if one is configured or requested.
fn open_log(cli: &Cli, config: &Config) -> Option<JsonlWriter> {
    let mut logging = config.logging.clone();
    if let Some(path) = &cli.log {
        logging.jsonl_path = Some(path.clone());
    }
    JsonlConfig::from_logging(&logging).map(JsonlWriter::open)
}

/// Load, grade and evaluate a run, logging a rejection before returning it.
fn evaluate_run(
    path: &Path,
    config: &Config,
    log: Option<&mut JsonlWriter>,
) -> Result<ResultsModel, CliError> {
    let result = RunDataset::load(path).and_then(|data| ResultsModel::from_dataset(&data, config));
    match result {
        Ok(model) => Ok(model),
        Err(err) => {
            if let Some(writer) = log {
                let entry = LogEntry {
                    details: Some(path.display().to_string()),
                    ..LogEntry::rejected(&err)
                };
                writer.write_entry(&entry);
                writer.flush();
            }
            Err(err.into())
        }
    }
}

fn load_model(cli: &Cli, run: &RunArgs) -> Result<(Config, ResultsModel), CliError> {
    let config = load_config(cli)?;
    let mut log = open_log(cli, &config);
    let model = evaluate_run(&run.run, &config, log.as_mut())?;
    Ok((config, model))
}

/// Drive `state` to the requested sort through the same actions a user would issue.
fn sort_to<C: Column>(
    state: &ViewState,
    current: impl Fn(&ViewState) -> SortState<C>,
    wrap: impl Fn(C) -> SortColumn,
    column: C,
    direction: SortDirection,
) -> ViewState {
    let mut next = state.clone();
    for _ in 0..3 {
        let sort = current(&next);
        if sort.column == column && sort.direction == direction {
            break;
        }
        next = state::update(&next, ViewAction::SortRequested(wrap(column)));
    }
    next
}

fn list_state<C: Column>(
    config: &Config,
    section: Section,
    list: &ListArgs,
    sort: Option<C>,
    current: impl Fn(&ViewState) -> SortState<C>,
    wrap: impl Fn(C) -> SortColumn,
) -> ViewState {
    let base = ViewState::from_config(&config.query);
    let base = state::update(&base, ViewAction::SectionSelected(section));
    let base = state::update(&base, ViewAction::FilterChanged(list.filter.clone()));
    let column = sort.unwrap_or_else(|| current(&base).column);
    let direction = if list.desc {
        SortDirection::Descending
    } else if sort.is_some() {
        SortDirection::Ascending
    } else {
        current(&base).direction
    };
    sort_to(&base, current, wrap, column, direction)
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("DV_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

fn paint_result(label: &str) -> ColoredString {
    match label {
        "PASSED" => label.green(),
        "FAILED" => label.red().bold(),
        "ABORTED" => label.magenta().bold(),
        "SKIPPED" => label.yellow(),
        other => other.normal(),
    }
}

fn paint_severity(severity: Severity) -> ColoredString {
    let label = severity.label();
    match severity {
        Severity::Good => label.green(),
        Severity::Missing => label.dimmed(),
        Severity::Suspect => label.yellow(),
        Severity::Critical => label.red().bold(),
    }
}

// ──────────────────── commands ────────────────────

fn run_evaluate(cli: &Cli, args: &RunArgs) -> Result<i32, CliError> {
    let config = load_config(cli)?;
    let mut log = open_log(cli, &config);
    if let Some(writer) = log.as_mut() {
        let entry = LogEntry {
            config_hash: Some(config.stable_hash()?),
            details: Some(config.paths.config_file.display().to_string()),
            ..LogEntry::new(EventType::ConfigLoaded, LogLevel::Info)
        };
        writer.write_entry(&entry);
    }

    let model = evaluate_run(&args.run, &config, log.as_mut())?;
    if let Some(writer) = log.as_mut() {
        evaluation::write(writer, &model);
    }

    let suite = model.suite();
    match output_mode(cli) {
        OutputMode::Human => {
            let t = suite.summary.tests;
            let v = suite.summary.verifications;
            let r = suite.summary.requirements;
            if !suite.title.is_empty() {
                println!("{}", suite.title.bold());
            }
            if let Some(device) = &suite.model {
                println!("device:        {device}");
            }
            println!("verdict:       {}", paint_result(suite.verdict.label()));
            println!(
                "tests:         {} total, {} passed, {} failed, {} skipped ({} aborted)",
                t.total, t.pass, t.fail, t.skip, t.aborted
            );
            println!(
                "verifications: {} total, {} passed, {} failed",
                v.total, v.pass, v.fail
            );
            println!(
                "requirements:  {} total, {} passed, {} failed",
                r.total, r.pass, r.fail
            );
            println!(
                "health:        {}",
                paint_severity(model.banner().display_severity())
            );
            if !suite.complete {
                println!("{}", "run incomplete: at least one test aborted".yellow());
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "evaluate",
                "verdict": suite.verdict,
                "exit_code": model.exit_code(),
                "complete": suite.complete,
                "summary": suite.summary,
                "health": model.banner().display_severity(),
                "evaluated_at": model.evaluated_at(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(model.exit_code())
}

fn run_requirements(cli: &Cli, args: &RequirementsArgs) -> Result<(), CliError> {
    let (config, model) = load_model(cli, &args.run)?;

    if let Some(id) = args.id {
        let requirement = model.requirement(id);
        let evidence = model.requirement_evidence(id);
        match output_mode(cli) {
            OutputMode::Human => {
                if requirement.has_evidence() {
                    println!(
                        "R{}  {}  {}  pass {}  fail {}",
                        id,
                        requirement.title(),
                        paint_result(requirement.result().label()),
                        requirement.pass(),
                        requirement.fail()
                    );
                } else {
                    println!("R{id}  no verifications recorded");
                }
                for row in &evidence {
                    let v = &row.verification;
                    println!(
                        "  #{:<4} test {:<3} step {:<3} {:<8} {}  [{}]",
                        v.number(),
                        row.test_number,
                        row.step_number,
                        paint_result(v.outcome().label()),
                        v.title(),
                        v.value()
                    );
                }
            }
            OutputMode::Json => {
                let payload = json!({
                    "command": "requirements",
                    "requirement": requirement,
                    "has_evidence": requirement.has_evidence(),
                    "evidence": evidence,
                });
                write_json_line(&payload)?;
            }
        }
        return Ok(());
    }

    let view = list_state(
        &config,
        Section::Requirements,
        &args.list,
        args.sort,
        |s| s.requirements_sort,
        SortColumn::Requirement,
    );
    let cache = RowCache::new(&model);
    let VisibleRows::Requirements(rows) = state::project(&view, &model, &cache) else {
        return Err(CliError::Runtime("requirements view produced other rows".to_string()));
    };

    match output_mode(cli) {
        OutputMode::Human => {
            for r in rows {
                println!(
                    "R{:<5} {:<8} pass {:<4} fail {:<4} {}",
                    r.number(),
                    paint_result(r.result().label()),
                    r.pass(),
                    r.fail(),
                    r.title()
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "requirements",
                "sort": view.requirements_sort.column.name(),
                "direction": view.requirements_sort.direction,
                "rows": rows,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_tests(cli: &Cli, args: &TestsArgs) -> Result<(), CliError> {
    let (config, model) = load_model(cli, &args.run)?;
    let view = list_state(
        &config,
        Section::Tests,
        &args.list,
        args.sort,
        |s| s.tests_sort,
        SortColumn::Test,
    );
    let cache = RowCache::new(&model);
    let VisibleRows::Tests(rows) = state::project(&view, &model, &cache) else {
        return Err(CliError::Runtime("tests view produced other rows".to_string()));
    };

    match output_mode(cli) {
        OutputMode::Human => {
            for t in rows {
                let v = t.summary.verifications;
                println!(
                    "{:>4}  {:<8} {:>3}/{:<3} {}",
                    t.number,
                    paint_result(t.result.label()),
                    v.pass,
                    v.total,
                    t.title
                );
            }
        }
        OutputMode::Json => {
            let rows: Vec<Value> = rows
                .iter()
                .map(|t| {
                    json!({
                        "number": t.number,
                        "title": t.title,
                        "result": t.result,
                        "summary": t.summary,
                    })
                })
                .collect();
            let payload = json!({
                "command": "tests",
                "sort": view.tests_sort.column.name(),
                "direction": view.tests_sort.direction,
                "rows": rows,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_verifications(cli: &Cli, args: &VerificationsArgs) -> Result<(), CliError> {
    let (config, model) = load_model(cli, &args.run)?;
    let mut view = list_state(
        &config,
        Section::Verifications,
        &args.list,
        args.sort,
        |s| s.verifications_sort,
        SortColumn::Verification,
    );
    if let Some(number) = args.test {
        view = state::update(&view, ViewAction::TestSelected(number));
    }
    if let Some(id) = args.requirement {
        view = state::update(&view, ViewAction::RequirementSelected(id));
    }
    let cache = RowCache::new(&model);
    let VisibleRows::Verifications(rows) = state::project(&view, &model, &cache) else {
        return Err(CliError::Runtime("verifications view produced other rows".to_string()));
    };

    match output_mode(cli) {
        OutputMode::Human => {
            for row in rows {
                let v = &row.verification;
                let req = v
                    .requirement_id()
                    .map_or_else(|| "-".to_string(), |id| format!("R{id}"));
                println!(
                    "#{:<4} {:>3}.{:<3} {:<6} {:<8} {}  [{}]",
                    v.number(),
                    row.test_number,
                    row.step_number,
                    req,
                    paint_result(v.outcome().label()),
                    v.title(),
                    v.value()
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "verifications",
                "sort": view.verifications_sort.column.name(),
                "direction": view.verifications_sort.direction,
                "rows": rows,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_health(cli: &Cli, args: &HealthArgs) -> Result<(), CliError> {
    let (config, model) = load_model(cli, &args.run)?;
    let banner = model.banner();

    let parameters = if args.parameters || args.sort.is_some() {
        let view = list_state(
            &config,
            Section::Health,
            &args.list,
            args.sort,
            |s| s.health_sort,
            SortColumn::Parameter,
        );
        let cache = RowCache::new(&model);
        match state::project(&view, &model, &cache) {
            VisibleRows::Health(rows) => Some(rows.into_iter().cloned().collect::<Vec<_>>()),
            _ => None,
        }
    } else {
        None
    };

    match output_mode(cli) {
        OutputMode::Human => {
            println!("system health: {}", paint_severity(banner.display_severity()));
            for group in model.groups() {
                println!("  {:<28} {}", group.name, paint_severity(group.severity));
            }
            if let Some(rows) = &parameters {
                println!();
                for row in rows {
                    let p = &row.parameter;
                    println!(
                        "  {:<36} {:<10} {:<24} {}",
                        p.name,
                        paint_severity(p.severity),
                        p.group,
                        p.value
                    );
                }
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "health",
                "banner": banner.severity,
                "banner_display": banner.display_severity(),
                "groups": model.groups(),
                "parameters": parameters,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    match output_mode(cli) {
        OutputMode::Human => {
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| CliError::Runtime(format!("failed to render config: {e}")))?;
            println!("# {}", config.paths.config_file.display());
            println!("# hash {}", config.stable_hash()?);
            print!("{toml_str}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config",
                "hash": config.stable_hash()?,
                "config": config,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}
