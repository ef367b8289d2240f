// crates/pvtx-runner/src/spawn.rs
// ============================================================================
// Module: Case Subprocess Execution
// Description: Spawns a case script, streams its output with redaction,
//              enforces the per-case timeout and abort signal, maps its
//              exit code to a status, and detects a reboot control file.
// Purpose: Give the engine one async entry point that turns a resolved
//          launch spec into a [`CaseOutcome`] without ever invoking a
//          shell.
// Dependencies: tokio, pvtx-contract, pvtx-core, libc (unix process groups)
// ============================================================================

//! ## Overview
//! [`execute_case`] spawns the script as the leader of its own process
//! group (Unix) so a timeout or abort can kill the whole tree instead of
//! just the direct child. `stdout`/`stderr` are streamed line-by-line,
//! redacted against the caller's secret needles, and appended to the two
//! log files as they arrive. After a normal exit, `control/reboot.json` is
//! scanned per the contract; when present and valid it overrides the
//! exit-code mapping entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use pvtx_contract::CaseError;
use pvtx_contract::ErrorKind;
use pvtx_contract::RebootControlFile;
use pvtx_contract::RebootInfo;
use pvtx_core::Status;
use pvtx_core::secret::redact_line;
use tokio::io::AsyncBufReadExt as _;
use tokio::io::AsyncWriteExt as _;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::sync::watch;

#[cfg(unix)]
use std::os::unix::process::CommandExt as _;

// ============================================================================
// SECTION: Launch Spec
// ============================================================================

/// Everything needed to launch and supervise one case script.
#[derive(Debug, Clone)]
pub struct CaseLaunchSpec {
    /// Path or name of the script interpreter / executable to run.
    pub program: String,
    /// Named-argument vector, already built by [`crate::argv::build_argv`].
    pub args: Vec<String>,
    /// Working directory for the subprocess.
    pub cwd: PathBuf,
    /// Full effective environment; no parent environment is inherited.
    pub env: BTreeMap<String, String>,
    /// Per-case timeout; exceeding it kills the process tree.
    pub timeout: Duration,
    /// Literal secret values to scrub from every streamed log line.
    pub secret_needles: Vec<String>,
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of running one case script to completion.
#[derive(Debug, Clone)]
pub struct CaseOutcome {
    /// Final status.
    pub status: Status,
    /// Process exit code, absent when the process never started or was
    /// killed by a signal.
    pub exit_code: Option<i32>,
    /// Structured error detail, present for every non-passed,
    /// non-reboot outcome.
    pub error: Option<CaseError>,
    /// Reboot request detail, present iff `status == RebootRequired`.
    pub reboot: Option<RebootInfo>,
}

/// Failure starting the subprocess or capturing its output. Distinct from
/// [`CaseOutcome`]: this only fires when the runner itself could not
/// supervise the process at all.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The process could not be started.
    #[error("failed to start process: {0}")]
    Spawn(std::io::Error),
    /// A stdout/stderr pipe was missing after spawn.
    #[error("missing output pipe")]
    MissingPipe,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs `spec` to completion, streaming output into `stdout_log`/
/// `stderr_log`, and returns the resulting [`CaseOutcome`].
///
/// `abort` is a single-shot watch channel: when its value becomes `true`
/// the process tree is killed immediately and the outcome is `Aborted`
/// regardless of timeout or exit code.
///
/// # Errors
///
/// Returns [`RunnerError`] if the process cannot be started at all, which
/// the caller maps to `Status::Error` with `error.type = RunnerError`.
pub async fn execute_case(
    spec: &CaseLaunchSpec,
    case_dir: &Path,
    stdout_log: &Path,
    stderr_log: &Path,
    mut abort: watch::Receiver<bool>,
) -> Result<CaseOutcome, RunnerError> {
    let mut child = spawn(spec).map_err(RunnerError::Spawn)?;
    let stdout = child.stdout.take().ok_or(RunnerError::MissingPipe)?;
    let stderr = child.stderr.take().ok_or(RunnerError::MissingPipe)?;

    let stdout_task = tokio::spawn(stream_to_log(stdout, stdout_log.to_path_buf(), spec.secret_needles.clone()));
    let stderr_task = tokio::spawn(stream_to_log(stderr, stderr_log.to_path_buf(), spec.secret_needles.clone()));

    let reason = tokio::select! {
        result = child.wait() => WaitReason::Exited(result),
        () = tokio::time::sleep(spec.timeout) => WaitReason::TimedOut,
        () = wait_for_abort(&mut abort) => WaitReason::Aborted,
    };

    let _stdout_result = stdout_task.await;
    let _stderr_result = stderr_task.await;

    Ok(match reason {
        WaitReason::Exited(Ok(status)) => finish_normal_exit(case_dir, status),
        WaitReason::Exited(Err(err)) => runner_error_outcome(format!("failed waiting on process: {err}")),
        WaitReason::TimedOut => {
            terminate(&mut child).await;
            CaseOutcome {
                status: Status::Timeout,
                exit_code: None,
                error: Some(CaseError { kind: ErrorKind::Timeout, message: format!("exceeded timeout of {:?}", spec.timeout) }),
                reboot: None,
            }
        }
        WaitReason::Aborted => {
            terminate(&mut child).await;
            CaseOutcome {
                status: Status::Aborted,
                exit_code: None,
                error: Some(CaseError { kind: ErrorKind::Aborted, message: "run was cancelled".to_string() }),
                reboot: None,
            }
        }
    })
}

/// Outcome of the race between process exit, timeout, and abort.
enum WaitReason {
    /// The process exited on its own.
    Exited(std::io::Result<std::process::ExitStatus>),
    /// The timeout elapsed first.
    TimedOut,
    /// The abort signal fired first.
    Aborted,
}

/// Resolves once `abort`'s value is `true`, and never resolves if the
/// sender is dropped without ever setting it.
async fn wait_for_abort(abort: &mut watch::Receiver<bool>) {
    loop {
        if *abort.borrow() {
            return;
        }
        if abort.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Builds the child process, run as its own process group leader on Unix so
/// the whole tree can be killed by group id.
fn spawn(spec: &CaseLaunchSpec) -> std::io::Result<Child> {
    let mut std_command = std::process::Command::new(&spec.program);
    std_command
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env_clear()
        .envs(&spec.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    {
        std_command.process_group(0);
    }
    let mut command = tokio::process::Command::from(std_command);
    command.kill_on_drop(true);
    command.spawn()
}

/// Kills the process tree. On Unix, sends `SIGKILL` to the whole process
/// group created at spawn time; on every platform, also asks the direct
/// child to die and reaps it so it does not linger as a zombie.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        #[allow(unsafe_code, reason = "killing a process group requires the raw libc call; no safe std API exists")]
        // SAFETY: `pid` is this child's own pid, and `process_group(0)` at
        // spawn time made it the leader of its own group, so signaling
        // `-pid` only reaches this subtree, not unrelated processes.
        unsafe {
            libc::kill(-(i32::try_from(pid).unwrap_or(i32::MAX)), libc::SIGKILL);
        }
    }
    let _unused = child.start_kill();
    let _unused = child.wait().await;
}

/// Streams `reader` line-by-line into `log_path`, redacting secret needles,
/// appending a newline after every line regardless of whether the source
/// line had one.
async fn stream_to_log(reader: impl tokio::io::AsyncRead + Unpin, log_path: PathBuf, needles: Vec<String>) {
    let Ok(mut file) = tokio::fs::OpenOptions::new().create(true).append(true).open(&log_path).await else {
        return;
    };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let redacted = redact_line(&line, &needles);
        if file.write_all(redacted.as_bytes()).await.is_err() {
            return;
        }
        if file.write_all(b"\n").await.is_err() {
            return;
        }
    }
}

// ============================================================================
// SECTION: Exit Code Mapping And Reboot Detection
// ============================================================================

/// Maps a normal process exit to a [`CaseOutcome`], overridden by a valid
/// `control/reboot.json` when one is present.
fn finish_normal_exit(case_dir: &Path, status: std::process::ExitStatus) -> CaseOutcome {
    match read_reboot_control(case_dir) {
        Some(Ok(info)) => CaseOutcome { status: Status::RebootRequired, exit_code: status.code(), error: None, reboot: Some(info) },
        Some(Err(detail)) => CaseOutcome {
            status: Status::Error,
            exit_code: status.code(),
            error: Some(CaseError { kind: ErrorKind::RunnerError, message: detail }),
            reboot: None,
        },
        None => outcome_from_exit_code(status.code()),
    }
}

/// Maps a raw exit code per the advisory contract: `0` passes, `1` fails,
/// anything else (including process-killed-by-signal, `None`) errors.
fn outcome_from_exit_code(code: Option<i32>) -> CaseOutcome {
    match code {
        Some(0) => CaseOutcome { status: Status::Passed, exit_code: code, error: None, reboot: None },
        Some(1) => CaseOutcome {
            status: Status::Failed,
            exit_code: code,
            error: Some(CaseError { kind: ErrorKind::ScriptError, message: "script exited with code 1".to_string() }),
            reboot: None,
        },
        Some(other) => CaseOutcome {
            status: Status::Error,
            exit_code: code,
            error: Some(CaseError { kind: ErrorKind::ScriptError, message: format!("script exited with unexpected code {other}") }),
            reboot: None,
        },
        None => runner_error_outcome("process terminated by signal".to_string()),
    }
}

/// Builds an `Error` outcome for a runner-side (not script-side) failure.
fn runner_error_outcome(message: String) -> CaseOutcome {
    CaseOutcome { status: Status::Error, exit_code: None, error: Some(CaseError { kind: ErrorKind::RunnerError, message }), reboot: None }
}

/// Scans `{case_dir}/control/reboot.json`. Returns `None` when absent,
/// `Some(Ok(info))` when present and valid, `Some(Err(detail))` when
/// present but malformed or invalid.
fn read_reboot_control(case_dir: &Path) -> Option<Result<RebootInfo, String>> {
    let path = case_dir.join("control").join("reboot.json");
    let content = std::fs::read_to_string(&path).ok()?;
    Some(
        serde_json::from_str::<RebootControlFile>(&content)
            .map_err(|err| format!("malformed reboot control file: {err}"))
            .and_then(|control| control.validate().map(|()| control.into()).map_err(|err| err.to_string())),
    )
}
