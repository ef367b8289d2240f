// crates/pvtx-engine/src/node.rs
// ============================================================================
// Module: Node Execution
// Description: Resolves a suite node's case reference to a manifest, then
//              runs one case attempt (with its retry budget) through the
//              subprocess runner.
// Purpose: Give the suite/plan orchestrators a single call that turns a
//          `SuiteNode` plus its resolved inputs/environment into a
//          terminal `Status` and case run folder.
// Dependencies: pvtx-core, pvtx-discovery, pvtx-runner, pvtx-runfolder
// ============================================================================

//! ## Overview
//! A suite node's `ref` names a case either by `id@version` (looked up in
//! the shared [`pvtx_discovery::DiscoveryIndex`]) or by a root-relative
//! path (resolved with [`pvtx_discovery::resolve_case_ref`]). A node id
//! carrying a `_<digits>` suffix — minted for a repeated node's Nth
//! iteration so each iteration gets a distinct run folder name — is
//! stripped back to its declared id before it is used as an override
//! lookup key, since `RunRequest::node_overrides` is keyed by the suite
//! manifest's own node ids.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use pvtx_core::EngineError;
use pvtx_core::Secret;
use pvtx_core::TestCaseManifest;
use pvtx_core::manifest::SuiteNode;
use pvtx_discovery::DiscoveryIndex;
use pvtx_discovery::resolve_case_ref;
use pvtx_runner::CaseLaunchSpec;
use pvtx_runner::CaseOutcome;
use pvtx_runner::RunnerError;
use serde_json::Value;
use tokio::sync::watch;

/// Program used to launch every case script. PowerShell Core is the only
/// runtime the engine specification names for `ScriptEntry::entry_point`.
const SCRIPT_PROGRAM: &str = "pwsh";

// ============================================================================
// SECTION: Node Id Helpers
// ============================================================================

/// Strips a trailing `_<digits>` repeat-iteration suffix from `node_id`,
/// returning the suite manifest's declared node id. Returns `node_id`
/// unchanged when it carries no such suffix.
#[must_use]
pub fn strip_resume_suffix(node_id: &str) -> &str {
    let Some(underscore) = node_id.rfind('_') else { return node_id };
    let (base, suffix) = node_id.split_at(underscore);
    let digits = &suffix[1..];
    if !digits.is_empty() && digits.bytes().all(|byte| byte.is_ascii_digit()) {
        base
    } else {
        node_id
    }
}

// ============================================================================
// SECTION: Case Reference Resolution
// ============================================================================

/// A suite node resolved to its backing case manifest.
#[derive(Debug, Clone)]
pub struct ResolvedNodeCase {
    /// Path to the resolved case's manifest directory.
    pub case_dir: PathBuf,
    /// The resolved case's parsed manifest.
    pub manifest: TestCaseManifest,
}

/// Resolves `node`'s `ref` to a case manifest, first against the shared
/// discovery index (`id@version` lookup) and, failing that, against the
/// cases root directly (root-relative path lookup).
///
/// # Errors
///
/// Returns [`EngineError::SuiteTestCaseRefInvalid`] when neither
/// resolution path finds a case, and [`EngineError::InvalidManifest`] when
/// a path-resolved manifest file cannot be parsed.
pub fn resolve_node_case(discovery: &DiscoveryIndex, cases_root: &Path, node: &SuiteNode) -> Result<ResolvedNodeCase, EngineError> {
    if let Ok(identity) = pvtx_core::Identity::parse(&node.case_ref) {
        if let Some(entry) = discovery.case(&identity) {
            let case_dir = entry.path.parent().map_or_else(|| entry.path.clone(), Path::to_path_buf);
            return Ok(ResolvedNodeCase { case_dir, manifest: entry.manifest.clone() });
        }
    }

    let manifest_path = resolve_case_ref(cases_root, &node.case_ref).map_err(|err| EngineError::SuiteTestCaseRefInvalid { case_ref: node.case_ref.clone(), reason: err.reason })?;
    let manifest = read_manifest(&manifest_path)?;
    let case_dir = manifest_path.parent().map_or_else(|| manifest_path.clone(), Path::to_path_buf);
    Ok(ResolvedNodeCase { case_dir, manifest })
}

/// Reads and parses a case manifest file, mapping any failure to
/// [`EngineError::InvalidManifest`].
fn read_manifest(manifest_path: &Path) -> Result<TestCaseManifest, EngineError> {
    let raw = std::fs::read_to_string(manifest_path).map_err(|source| EngineError::Io { path: manifest_path.display().to_string(), source })?;
    serde_json::from_str(&raw).map_err(|source| EngineError::InvalidManifest { path: manifest_path.display().to_string(), detail: source.to_string() })
}

// ============================================================================
// SECTION: Attempt Execution
// ============================================================================

/// Inputs a single node attempt needs from the caller, already resolved by
/// [`crate::inputs`] and [`crate::env`].
#[derive(Debug, Clone)]
pub struct NodeAttemptSpec {
    /// Absolute path to the case run folder this attempt executes in.
    pub case_dir: PathBuf,
    /// Absolute path to the manifest's source directory, where the script
    /// entry point actually lives on disk (distinct from `case_dir`, which
    /// is a freshly created, empty run folder).
    pub source_dir: PathBuf,
    /// The resolved case manifest's script entry point, relative to
    /// `source_dir`.
    pub entry_point: String,
    /// Named argument vector built from the case's declared parameters.
    pub argv: Vec<String>,
    /// Final environment map for the subprocess.
    pub env: BTreeMap<String, String>,
    /// Effective inputs, kept for the `params.json`/`manifest.json`
    /// snapshots written by the caller.
    pub effective_inputs: BTreeMap<String, Secret<Value>>,
    /// Per-case timeout.
    pub timeout: Duration,
    /// Literal secret values to redact from streamed output.
    pub secret_needles: Vec<String>,
}

/// Runs one case attempt through the subprocess runner, streaming its
/// stdout/stderr to `stdout_log`/`stderr_log`.
///
/// # Errors
///
/// Returns [`RunnerError`] when the subprocess cannot be spawned or its
/// stdio pipes are unavailable; a script's own failure is reported as a
/// terminal [`CaseOutcome`], not an error.
pub async fn run_attempt(spec: &NodeAttemptSpec, stdout_log: &Path, stderr_log: &Path, abort: watch::Receiver<bool>) -> Result<CaseOutcome, RunnerError> {
    let script_path = spec.source_dir.join(&spec.entry_point);
    let launch = CaseLaunchSpec {
        program: SCRIPT_PROGRAM.to_string(),
        args: build_args(&script_path, &spec.argv),
        cwd: spec.case_dir.clone(),
        env: spec.env.clone(),
        timeout: spec.timeout,
        secret_needles: spec.secret_needles.clone(),
    };
    pvtx_runner::execute_case(&launch, &spec.case_dir, stdout_log, stderr_log, abort).await
}

/// Builds the full subprocess argument vector: PowerShell's non-interactive
/// flags, the script entry point's absolute path, then the case's named
/// parameter arguments.
fn build_args(script_path: &Path, argv: &[String]) -> Vec<String> {
    let mut args = vec!["-NoLogo".to_string(), "-NoProfile".to_string(), "-File".to_string(), script_path.display().to_string()];
    args.extend(argv.iter().cloned());
    args
}

// ============================================================================
// SECTION: Retry Loop
// ============================================================================

/// Runs a node attempt up to `1 + retry_on_error` times, retrying only
/// `Error`/`Timeout` outcomes per [`Status::is_retryable`]. Returns the
/// last attempt's outcome together with the number of attempts made.
///
/// # Errors
///
/// Propagates the first [`RunnerError`] from [`run_attempt`]; a runner
/// error aborts the retry loop rather than counting as a retryable
/// outcome, since it signals the subprocess could not be launched at all.
pub async fn run_with_retries(spec: &NodeAttemptSpec, stdout_log: &Path, stderr_log: &Path, retry_on_error: u32, abort: watch::Receiver<bool>, mut on_retry: impl FnMut()) -> Result<(CaseOutcome, u32), RunnerError> {
    let max_attempts = 1 + retry_on_error;
    let mut attempt = 1;
    loop {
        let outcome = run_attempt(spec, stdout_log, stderr_log, abort.clone()).await?;
        if attempt >= max_attempts || !outcome.status.is_retryable() {
            return Ok((outcome, attempt));
        }
        on_retry();
        attempt += 1;
    }
}
