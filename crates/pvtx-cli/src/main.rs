// crates/pvtx-cli/src/main.rs
// ============================================================================
// Module: PVT-X CLI Entry Point
// Description: Command dispatcher for the engine core's run and resume
//              workflows, plus read-only discovery listing.
// Purpose: Give an operator or a scheduled task a thin, scriptable front
//          end over `pvtx-engine`'s `Engine::run`/`Engine::resume`.
// Dependencies: clap, pvtx-config, pvtx-core, pvtx-discovery, pvtx-engine,
//               serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! Three subcommands: `run` validates and dispatches a [`pvtx_core::RunRequest`]
//! read from a JSON file (or a convenience `--suite`/`--plan`/`--test-case`
//! flag for the override-free case), `resume` re-enters a session a prior
//! process suspended for a reboot, and `discover` lists what the
//! configured roots resolve to without running anything. All three share
//! one `Engine` construction path and one console reporter.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod platform;
mod reporter;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use pvtx_config::PvtxConfig;
use pvtx_core::RunRequest;
use pvtx_core::Status;
use pvtx_engine::Engine;
use pvtx_engine::EngineResumeError;
use pvtx_engine::EngineRunError;
use pvtx_engine::reporter::ChannelReporter;
use pvtx_engine::telemetry::NullTelemetry;
use thiserror::Error;

use crate::platform::LocalPlatformAdapter;
use crate::reporter::run_console_drain;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "pvtx", disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs a suite, plan, or standalone test case.
    Run(RunCommand),
    /// Resumes a session a prior process suspended for a reboot.
    Resume(ResumeCommand),
    /// Lists discovered cases, suites, and plans.
    Discover(DiscoverCommand),
}

/// Shared config-path argument for every subcommand that builds an engine.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Path to `pvtx.toml` (defaults to `PVTX_CONFIG` or `./pvtx.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug)]
struct RunCommand {
    /// Engine configuration.
    #[command(flatten)]
    config: ConfigArgs,
    /// Path to a `RunRequest` JSON file. Mutually exclusive with the
    /// convenience target flags below.
    #[arg(long, value_name = "PATH", conflicts_with_all = ["suite", "plan", "test_case"])]
    request: Option<PathBuf>,
    /// Run a suite by `id@version`.
    #[arg(long, value_name = "ID@VERSION", conflicts_with_all = ["plan", "test_case"])]
    suite: Option<String>,
    /// Run a plan by `id@version`.
    #[arg(long, value_name = "ID@VERSION", conflicts_with_all = ["suite", "test_case"])]
    plan: Option<String>,
    /// Run a standalone test case by `id@version`.
    #[arg(long = "test-case", value_name = "ID@VERSION", conflicts_with_all = ["suite", "plan"])]
    test_case: Option<String>,
}

/// Arguments for the `resume` subcommand.
#[derive(Args, Debug)]
struct ResumeCommand {
    /// Engine configuration.
    #[command(flatten)]
    config: ConfigArgs,
    /// Run id of the session to resume.
    #[arg(long = "run-id", value_name = "RUN_ID")]
    run_id: String,
    /// Resume token presented by the scheduled task.
    #[arg(long, value_name = "TOKEN")]
    token: String,
    /// Runs root the session lives under. Present for parity with the
    /// autostart contract; the engine's own configured `runsRoot` is
    /// authoritative when the two disagree.
    #[arg(long = "runs-root", value_name = "PATH")]
    runs_root: Option<PathBuf>,
}

/// Arguments for the `discover` subcommand.
#[derive(Args, Debug)]
struct DiscoverCommand {
    /// Engine configuration.
    #[command(flatten)]
    config: ConfigArgs,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Top-level CLI error wrapper.
#[derive(Debug, Error)]
enum CliError {
    /// The configuration file could not be loaded.
    #[error("failed to load configuration: {0}")]
    Config(#[from] pvtx_config::ConfigError),
    /// The engine could not be constructed from the resolved roots.
    #[error("failed to build engine: {0}")]
    Engine(#[from] pvtx_core::EngineError),
    /// A request file could not be read or did not parse as JSON.
    #[error("failed to read request {path}: {source}")]
    RequestRead {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A request file's contents did not parse as a [`RunRequest`].
    #[error("failed to parse request {path}: {source}")]
    RequestParse {
        /// Path that failed to parse.
        path: String,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
    /// Neither `--request` nor a convenience target flag was given to
    /// `run`.
    #[error("run requires --request or one of --suite/--plan/--test-case")]
    MissingTarget,
    /// Dispatching a validated run request failed.
    #[error(transparent)]
    Run(#[from] EngineRunError),
    /// Resuming a suspended session failed.
    #[error(transparent)]
    Resume(#[from] EngineResumeError),
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(status) => exit_code_for(status),
        Err(err) => {
            write_stderr_line(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Executes the CLI command dispatcher, returning the run's terminal
/// status when one was produced (discovery has none, and reports success
/// unconditionally).
async fn run() -> CliResult<Option<Status>> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(command) => command_run(command).await.map(Some),
        Commands::Resume(command) => command_resume(command).await.map(Some),
        Commands::Discover(command) => {
            command_discover(command)?;
            Ok(None)
        }
    }
}

/// Maps a run's terminal status to a process exit code: `Passed` is
/// success, every other terminal status (including `RebootRequired`,
/// which is itself a success for this process's purposes — the machine
/// is about to restart, not fail) is reported as a CLI success too, since
/// the run's own `result.json`/`session.json` carries the authoritative
/// detail. Discovery (`None`) is always success.
const fn exit_code_for(status: Option<Status>) -> ExitCode {
    match status {
        None | Some(Status::Passed | Status::RebootRequired) => ExitCode::SUCCESS,
        Some(_) => ExitCode::FAILURE,
    }
}

// ============================================================================
// SECTION: Engine Construction
// ============================================================================

/// Loads configuration and builds an [`Engine`] over its resolved roots.
fn build_engine(config: &ConfigArgs) -> CliResult<Engine> {
    let loaded = PvtxConfig::load(config.config.as_deref())?;
    let engine = Engine::new(loaded.roots, loaded.limits, Box::new(LocalPlatformAdapter::new()))?;
    Ok(engine)
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` subcommand.
async fn command_run(command: RunCommand) -> CliResult<Status> {
    let engine = build_engine(&command.config)?;
    let request = build_run_request(&command)?;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let reporter = ChannelReporter::new(tx);
    let telemetry = NullTelemetry;
    let (_abort_tx, abort_rx) = tokio::sync::watch::channel(false);

    let drain = tokio::spawn(run_console_drain(rx));
    let outcome = engine.run(&request, &reporter, &telemetry, abort_rx).await;
    drop(reporter);
    let _ignored = drain.await;

    let outcome = outcome?;
    write_stdout_line(&format!("run {} finished: {:?}", outcome.run_id, outcome.status));
    Ok(outcome.status)
}

/// Builds a [`RunRequest`] from either `--request` or a convenience target
/// flag.
fn build_run_request(command: &RunCommand) -> CliResult<RunRequest> {
    if let Some(path) = &command.request {
        let raw = std::fs::read_to_string(path).map_err(|source| CliError::RequestRead { path: path.display().to_string(), source })?;
        let request: RunRequest = serde_json::from_str(&raw).map_err(|source| CliError::RequestParse { path: path.display().to_string(), source })?;
        return Ok(request);
    }

    let target = if let Some(suite) = &command.suite {
        pvtx_core::RunTarget::Suite { suite: suite.clone() }
    } else if let Some(plan) = &command.plan {
        pvtx_core::RunTarget::Plan { plan: plan.clone() }
    } else if let Some(test_case) = &command.test_case {
        pvtx_core::RunTarget::TestCase { test_case: test_case.clone() }
    } else {
        return Err(CliError::MissingTarget);
    };

    Ok(RunRequest { target, node_overrides: BTreeMap::new(), case_inputs: BTreeMap::new(), environment_overrides: pvtx_core::request::EnvironmentOverrides::default() })
}

// ============================================================================
// SECTION: Resume Command
// ============================================================================

/// Executes the `resume` subcommand.
async fn command_resume(command: ResumeCommand) -> CliResult<Status> {
    let engine = build_engine(&command.config)?;
    warn_on_runs_root_mismatch(&command, &engine);

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let reporter = ChannelReporter::new(tx);
    let telemetry = NullTelemetry;
    let (_abort_tx, abort_rx) = tokio::sync::watch::channel(false);

    let drain = tokio::spawn(run_console_drain(rx));
    let outcome = engine.resume(&command.run_id, &command.token, &reporter, &telemetry, abort_rx).await;
    drop(reporter);
    let _ignored = drain.await;

    let outcome = outcome?;
    write_stdout_line(&format!("resume {} finished: {:?}", outcome.run_id, outcome.status));
    Ok(outcome.status)
}

/// Warns on stderr when the `--runs-root` the autostart task passed back
/// disagrees with the configured engine's own resolved runs root. The
/// engine's own configuration is authoritative either way; this exists
/// only to surface a stale scheduled task after a config change.
fn warn_on_runs_root_mismatch(command: &ResumeCommand, engine: &Engine) {
    let Some(passed) = &command.runs_root else {
        return;
    };
    let configured = engine.roots().runs_root.as_path();
    if configured != passed.as_path() {
        write_stderr_line(&format!("warning: --runs-root {} does not match configured runs root {}; using configured root", passed.display(), configured.display()));
    }
}

// ============================================================================
// SECTION: Discover Command
// ============================================================================

/// Executes the `discover` subcommand.
fn command_discover(command: DiscoverCommand) -> CliResult<()> {
    let engine = build_engine(&command.config)?;
    let discovery = engine.discovery();
    write_stdout_line(&format!("cases: {}, suites: {}, plans: {}", discovery.case_count(), discovery.suite_count(), discovery.plan_count()));
    Ok(())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout, discarding any write failure.
fn write_stdout_line(message: &str) {
    let mut stdout = std::io::stdout();
    let _ignored = writeln!(stdout, "{message}");
}

/// Writes a single line to stderr, discarding any write failure.
fn write_stderr_line(message: &str) {
    let mut stderr = std::io::stderr();
    let _ignored = writeln!(stderr, "{message}");
}
