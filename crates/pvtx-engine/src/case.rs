// crates/pvtx-engine/src/case.rs
// ============================================================================
// Module: Standalone Case Orchestrator
// Description: Runs a single test case outside any suite or plan context.
// Purpose: Give a standalone `RunTarget::TestCase` request the same
//          resolve/resolve-inputs/execute/record pipeline a suite node
//          gets, minus the group bookkeeping a suite or plan owns.
// Dependencies: pvtx-core, pvtx-discovery, pvtx-runner, pvtx-runfolder
// ============================================================================

//! ## Overview
//! A standalone case run has no suite node, no suite environment, and no
//! per-node override map to merge against — only the request's own
//! `caseInputs` and `environmentOverrides`. Its [`pvtx_contract::IndexEntry`]
//! is well-formed-standalone per
//! [`pvtx_contract::IndexEntry::is_well_formed_standalone_case`]: every
//! suite/plan/node field is `None`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use pvtx_contract::IndexEntry;
use pvtx_contract::TestCaseResult;
use pvtx_contract::index::RunKind;
use pvtx_contract::session::CaseResumeContext;
use pvtx_contract::session::EntityResumeState;
use pvtx_core::EngineError;
use pvtx_core::Identity;
use pvtx_core::TestCaseManifest;
use pvtx_core::Timestamp;
use pvtx_core::request::EnvironmentOverrides;
use pvtx_discovery::DiscoveryIndex;
use pvtx_discovery::resolve_case_ref;
use pvtx_runner::ResultContext;
use serde_json::Value;
use tokio::sync::watch;

use crate::env::EnvironmentLayers;
use crate::env::PredefinedContext;
use crate::env::resolve_environment;
use crate::inputs::InputError;
use crate::inputs::resolve_inputs;
use crate::inputs::validate_paths_exist;
use crate::node::NodeAttemptSpec;
use crate::node::run_with_retries;
use crate::reporter::NodeFinished;
use crate::reporter::NodeStarted;
use crate::reporter::RunFinished;
use crate::reporter::RunPlanned;
use crate::resume::ResumeError;
use crate::resume::SuspendRequest;
use crate::resume::suspend_for_reboot;
use crate::suite::EngineContext;

/// Failure running a standalone case. A node's own script failure is a
/// `Status`, not an `Err`; this enum captures failures in resolving or
/// preparing the run itself.
#[derive(Debug, thiserror::Error)]
pub enum CaseRunError {
    /// The requested case reference did not resolve to a manifest.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// The case's inputs failed static or pre-node validation.
    #[error(transparent)]
    Input(#[from] InputError),
    /// The run folder layout could not be created or written, or a
    /// run-folder artifact could not be recorded.
    #[error("run folder I/O failed: {0}")]
    Io(#[source] std::io::Error),
    /// The case requested a reboot but the session could not be
    /// persisted or the platform adapter refused to schedule/issue it.
    #[error(transparent)]
    Resume(#[from] ResumeError),
}

impl From<std::io::Error> for CaseRunError {
    fn from(source: std::io::Error) -> Self {
        Self::Io(source)
    }
}

/// Resolves `case_ref` to a manifest, trying an `id@version` identity
/// lookup first and a root-relative path second.
///
/// # Errors
///
/// Returns [`EngineError::SuiteTestCaseRefInvalid`] when neither
/// resolution path finds a case.
pub fn resolve_standalone_case(discovery: &DiscoveryIndex, cases_root: &std::path::Path, case_ref: &str) -> Result<(PathBuf, TestCaseManifest), EngineError> {
    if let Ok(identity) = Identity::parse(case_ref) {
        if let Some(entry) = discovery.case(&identity) {
            let case_dir = entry.path.parent().map_or_else(|| entry.path.clone(), std::path::Path::to_path_buf);
            return Ok((case_dir, entry.manifest.clone()));
        }
    }
    let manifest_path = resolve_case_ref(cases_root, case_ref).map_err(|err| EngineError::SuiteTestCaseRefInvalid { case_ref: case_ref.to_string(), reason: err.reason })?;
    let raw = std::fs::read_to_string(&manifest_path).map_err(|source| EngineError::Io { path: manifest_path.display().to_string(), source })?;
    let manifest: TestCaseManifest = serde_json::from_str(&raw).map_err(|source| EngineError::InvalidManifest { path: manifest_path.display().to_string(), detail: source.to_string() })?;
    let case_dir = manifest_path.parent().map_or_else(|| manifest_path.clone(), std::path::Path::to_path_buf);
    Ok((case_dir, manifest))
}

/// Runs one standalone case to completion, returning its
/// [`TestCaseResult`]. `resume_phase`, when present, re-enters a case
/// suspended for a reboot at that phase instead of starting fresh at
/// phase 0; the caller is expected to reuse the suspended run's own
/// `run_id` so logs append rather than restart.
///
/// # Errors
///
/// Returns [`CaseRunError`] when the case reference cannot be resolved,
/// its inputs fail validation, or a run folder write fails.
pub async fn run_case(ctx: &EngineContext<'_>, case_ref: &str, case_inputs: &BTreeMap<String, Value>, environment_overrides: &EnvironmentOverrides, run_id: &str, resume_phase: Option<u32>, abort: watch::Receiver<bool>) -> Result<TestCaseResult, CaseRunError> {
    let (source_dir, manifest) = resolve_standalone_case(ctx.discovery, &ctx.roots.cases_root, case_ref)?;
    let mut resolved_inputs = resolve_inputs(&manifest, case_inputs)?;
    validate_paths_exist(&source_dir, &manifest, &resolved_inputs)?;

    let case_dir = ctx.manager.create_case_folder(run_id)?;
    let identity = manifest.identity().map_err(|err| EngineError::InvalidManifest { path: source_dir.display().to_string(), detail: err.to_string() })?;
    let modules_root = ctx.roots.modules_root();
    let control_dir = case_dir.join("control");
    let phase = resume_phase.unwrap_or(0);
    let predefined = PredefinedContext { test_case_path: &source_dir, test_case_identity: &identity, assets_root: &ctx.roots.assets_root, modules_root: &modules_root, run_id, phase, control_dir: &control_dir };
    let layers = EnvironmentLayers { plan: None, suite: None, request_overrides: &environment_overrides.env };
    let env = resolve_environment(&layers, &predefined);
    let env_plain: BTreeMap<String, String> = env.iter().map(|(name, value)| (name.clone(), value.expose_for_exec().clone())).collect();

    if resume_phase.is_none() {
        ctx.reporter.on_run_planned(RunPlanned { run_id: run_id.to_string(), planned_node_count: 1 });
    }
    ctx.reporter.on_node_started(NodeStarted { run_id: run_id.to_string(), node_id: None, attempt: 1 });

    let spec = NodeAttemptSpec {
        case_dir: case_dir.clone(),
        source_dir: source_dir.clone(),
        entry_point: manifest.script.entry_point.clone(),
        argv: pvtx_runner::build_argv(&manifest.parameters, &resolved_inputs.effective_inputs),
        env: env_plain,
        effective_inputs: std::mem::take(&mut resolved_inputs.effective_inputs),
        timeout: std::time::Duration::from_secs(manifest.timeout_sec),
        secret_needles: resolved_inputs.secret_needles.clone(),
    };

    let start_time = Timestamp::now();
    let (outcome, _attempts) = run_with_retries(&spec, &case_dir.join("stdout.log"), &case_dir.join("stderr.log"), 0, abort.clone(), || ctx.telemetry.record_retry()).await.map_err(|source| CaseRunError::Io(std::io::Error::other(source.to_string())))?;
    let end_time = Timestamp::now();
    ctx.telemetry.record_node_attempt(outcome.status);

    let env_secrets: BTreeMap<String, pvtx_core::Secret<String>> = spec.env.iter().map(|(name, value)| (name.clone(), pvtx_core::Secret::plain(value.clone()))).collect();
    crate::snapshot::write_manifest_snapshot(&case_dir, &manifest, case_ref, &identity, &env_secrets, &spec.effective_inputs, start_time).map_err(to_io)?;
    pvtx_runner::write_params_snapshot(&case_dir, &spec.effective_inputs).map_err(to_io)?;
    pvtx_runner::write_env_snapshot(&case_dir, &env_secrets).map_err(to_io)?;

    let status = if *abort.borrow() { outcome.status.force_aborted() } else { outcome.status };
    let context = ResultContext::default();
    let result = pvtx_runner::build_case_result(&manifest, &context, status, start_time, end_time, outcome.exit_code, spec.effective_inputs.clone(), outcome.error.clone(), None, outcome.reboot.clone());
    pvtx_runner::write_result(&case_dir, &result).map_err(to_io)?;

    if let Some(reboot) = outcome.reboot.clone() {
        let case_resume = CaseResumeContext {
            run_id: run_id.to_string(),
            test_id: identity.id().to_string(),
            test_version: identity.version().to_string(),
            node_id: None,
            phase: predefined.phase,
            effective_inputs: spec.effective_inputs.clone(),
            effective_environment: env_secrets,
        };
        let suspend_request = SuspendRequest {
            run_id,
            entity_type: EntityResumeState::TestCase,
            next_phase: reboot.next_phase,
            current_node_index: None,
            current_child_run_id: None,
            current_iteration: None,
            case_resume: Some(case_resume),
            target_ref: None,
            delay_sec: reboot.delay_sec,
            resume_count: ctx.resume_count,
        };
        suspend_for_reboot(ctx.roots, ctx.platform, suspend_request)?;
    }

    let entry = IndexEntry {
        run_id: run_id.to_string(),
        run_type: RunKind::TestCase,
        node_id: None,
        test_id: Some(identity.id().to_string()),
        test_version: Some(identity.version().to_string()),
        suite_id: None,
        suite_version: None,
        plan_id: None,
        plan_version: None,
        parent_run_id: None,
        start_time,
        end_time,
        status,
    };
    debug_assert!(entry.is_well_formed_standalone_case());
    let line = serde_json::to_string(&entry).map_err(|err| CaseRunError::Io(std::io::Error::other(err.to_string())))?;
    ctx.manager.append_index_line(&line, ctx.limits.append_retry_backoff_ms.as_slice()).map_err(|err| CaseRunError::Io(std::io::Error::other(err.to_string())))?;

    ctx.reporter.on_node_finished(NodeFinished { run_id: run_id.to_string(), node_id: None, status });
    ctx.reporter.on_run_finished(RunFinished { run_id: run_id.to_string(), status });
    Ok(result)
}

/// Converts a [`pvtx_runfolder::WriteError`] into a [`CaseRunError`].
fn to_io(source: pvtx_runfolder::WriteError) -> CaseRunError {
    CaseRunError::Io(std::io::Error::other(source.to_string()))
}
