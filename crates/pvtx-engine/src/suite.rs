// crates/pvtx-engine/src/suite.rs
// ============================================================================
// Module: Suite Orchestrator
// Description: Runs a test suite's nodes in declared order, across its
//              repeat count, honoring continueOnFailure/retryOnError and
//              folding node outcomes into one group result.
// Purpose: Own the suite-level state machine so plan orchestration can
//          treat a suite run as one call that returns a terminal status.
// Dependencies: pvtx-core, pvtx-contract, pvtx-discovery, pvtx-runfolder,
//               pvtx-runner
// ============================================================================

//! ## Overview
//! A suite run walks `controls.effective_repeat()` iterations of
//! `test_cases` in declared order. `continueOnFailure: false` stops the
//! walk at the first node whose aggregate status is not
//! [`pvtx_core::Status::Passed`], emitting a skip event for every node the
//! stop preempts. `maxParallel > 1` is accepted but downgraded to
//! sequential execution with a warning event, since nothing in this engine
//! core parallelizes node dispatch. A signaled abort is folded in with
//! [`pvtx_core::Status::force_aborted`] so it always wins the aggregate,
//! even over an `Error`/`Timeout` node that finished moments earlier.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use pvtx_config::EngineLimits;
use pvtx_config::PlatformAdapter;
use pvtx_config::Roots;
use pvtx_contract::Counts;
use pvtx_contract::EventRecord;
use pvtx_contract::EventSeverity;
use pvtx_contract::GroupResult;
use pvtx_contract::GroupRunType;
use pvtx_contract::IndexEntry;
use pvtx_contract::events::CODE_MAX_PARALLEL_IGNORED;
use pvtx_contract::events::CODE_SECRET_ON_COMMAND_LINE;
use pvtx_contract::events::CODE_SUITE_NODE_SKIPPED;
use pvtx_contract::events::CODE_TEST_CASE_REBOOT_REQUESTED;
use pvtx_contract::index::RunKind;
use pvtx_contract::session::CaseResumeContext;
use pvtx_contract::session::EntityResumeState;
use pvtx_core::EngineError;
use pvtx_core::Identity;
use pvtx_core::Secret;
use pvtx_core::Status;
use pvtx_core::Timestamp;
use pvtx_core::manifest::PlanEnvironment;
use pvtx_core::manifest::SuiteControls;
use pvtx_core::manifest::TestSuiteManifest;
use pvtx_core::request::EnvironmentOverrides;
use pvtx_core::request::NodeOverride;
use pvtx_discovery::DiscoveryIndex;
use pvtx_runfolder::AppendLog;
use pvtx_runfolder::ChildrenReadError;
use pvtx_runfolder::RunFolderManager;
use pvtx_runfolder::reconstruct_children_ordered;
use pvtx_runfolder::write_json_atomic;
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
use crate::node::resolve_node_case;
use crate::node::run_attempt;
use crate::record::RecordError;
use crate::record::record_node_outcome;
use crate::reporter::NodeStarted;
use crate::reporter::Reporter;
use crate::reporter::RunFinished;
use crate::reporter::RunPlanned;
use crate::resume::ResumeError;
use crate::resume::SuspendRequest;
use crate::resume::suspend_for_reboot;
use crate::telemetry::Telemetry;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Failure running a suite, distinct from a node's own terminal status
/// (which is always folded into the returned [`GroupResult`], never an
/// `Err`).
#[derive(Debug, thiserror::Error)]
pub enum SuiteRunError {
    /// A node's `ref` could not be resolved to a case manifest.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A node's inputs failed static or pre-node validation.
    #[error(transparent)]
    Input(#[from] InputError),
    /// The run folder layout could not be created or written.
    #[error("run folder I/O failed: {0}")]
    Io(#[source] std::io::Error),
    /// An outcome could not be recorded to the JSONL logs.
    #[error(transparent)]
    Record(#[from] RecordError),
    /// A node requested a reboot but the session could not be persisted
    /// or the platform adapter refused to schedule/issue it.
    #[error(transparent)]
    Resume(#[from] ResumeError),
}

impl From<std::io::Error> for SuiteRunError {
    fn from(source: std::io::Error) -> Self {
        Self::Io(source)
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Everything [`run_suite`] needs beyond the shared engine context: the
/// suite itself, its identity, its effective controls (already merged
/// with a plan-level override where applicable), and the request-supplied
/// per-node and environment overrides.
pub struct SuiteRunRequest<'a> {
    /// The suite manifest being run.
    pub suite: &'a TestSuiteManifest,
    /// The suite's parsed identity, stamped into every child result.
    pub suite_identity: &'a Identity,
    /// Effective controls for this run.
    pub controls: SuiteControls,
    /// Request-level per-node input overrides, keyed by declared node id.
    pub node_overrides: &'a BTreeMap<String, NodeOverride>,
    /// Request-level environment overrides, legal at every scope.
    pub environment_overrides: &'a EnvironmentOverrides,
    /// The owning plan's environment, when this suite runs as part of a
    /// plan; `None` for a standalone suite run.
    pub plan_environment: Option<&'a PlanEnvironment>,
    /// The owning plan's identity, stamped into every child result when
    /// present.
    pub plan_identity: Option<&'a Identity>,
    /// Parent run id for `index.jsonl`'s `parentRunId`, when this suite
    /// runs as part of a plan.
    pub parent_run_id: Option<&'a str>,
    /// Present when this call is re-entering a suite suspended mid-run
    /// for a reboot, rather than starting it fresh.
    pub resume: Option<SuiteResume>,
}

/// Saved progress for a suite resuming after a reboot, carried from the
/// suite's own persisted [`pvtx_contract::SessionFile`].
#[derive(Debug, Clone)]
pub struct SuiteResume {
    /// Repeat-iteration the suite was suspended during.
    pub start_iteration: u32,
    /// Index of the node the suite was suspended at.
    pub start_node_index: usize,
    /// Phase the resumed node should run at, from the reboot control
    /// file's `nextPhase`.
    pub next_phase: u32,
    /// Run id of the in-flight child at suspension time; reused instead
    /// of minting a fresh one so the resumed attempt appends to the same
    /// case run folder.
    pub resumed_run_id: String,
}

// ============================================================================
// SECTION: Shared Context
// ============================================================================

/// Engine-wide collaborators every orchestrator level shares.
pub struct EngineContext<'a> {
    /// Resolved filesystem roots.
    pub roots: &'a Roots,
    /// Tunable engine limits (retry backoff, default timeout).
    pub limits: &'a EngineLimits,
    /// The shared case/suite/plan discovery index.
    pub discovery: &'a DiscoveryIndex,
    /// The run folder manager (run id minting, folder creation, shared
    /// index append).
    pub manager: &'a RunFolderManager,
    /// Observer for lifecycle events.
    pub reporter: &'a dyn Reporter,
    /// Engine-wide counters.
    pub telemetry: &'a dyn Telemetry,
    /// Platform abstraction for scheduling and issuing a reboot.
    pub platform: &'a dyn PlatformAdapter,
    /// Resume attempts already spent against the run id in flight, `0` for
    /// a fresh (never resumed) run. Carried into [`crate::resume::SuspendRequest`]
    /// so a run that reboots again after already resuming once does not
    /// reset the ceiling [`crate::resume::advance_resume`] enforces.
    pub resume_count: u32,
}

// ============================================================================
// SECTION: Suite Execution
// ============================================================================

/// Runs one suite to completion, returning its aggregate [`GroupResult`].
///
/// # Errors
///
/// Returns [`SuiteRunError`] when a node's reference cannot be resolved,
/// its inputs fail validation, or a run folder write fails. A node
/// script's own failure, timeout, or abort is captured as a `Status` in
/// the returned result, never as an `Err`.
pub async fn run_suite(ctx: &EngineContext<'_>, request: &SuiteRunRequest<'_>, group_run_id: &str, mut abort: watch::Receiver<bool>) -> Result<GroupResult, SuiteRunError> {
    validate_node_overrides(request.suite, request.node_overrides)?;

    let group_dir = ctx.manager.create_group_folder(group_run_id)?;
    let children_log = AppendLog::new(group_dir.join("children.jsonl"));
    let events_log = AppendLog::new(group_dir.join("events.jsonl"));
    let backoff = ctx.limits.append_retry_backoff_ms.as_slice();

    let mut child_run_ids = Vec::new();
    let mut node_statuses = Vec::new();
    let resume_point = request.resume.as_ref().map(|resume| (resume.start_iteration, resume.start_node_index));
    let mut group_start_time = Timestamp::now();

    if request.resume.is_some() {
        let prior = reconstruct_children_ordered(&group_dir.join("children.jsonl")).unwrap_or_else(|err: ChildrenReadError| {
            debug_assert!(matches!(err, ChildrenReadError::Io { .. }), "a malformed children.jsonl should never reach resume");
            Vec::new()
        });
        if let Some(earliest) = prior.first() {
            group_start_time = earliest.start_time;
        }
        for entry in latest_attempt_per_node(prior) {
            child_run_ids.push(entry.run_id);
            node_statuses.push(entry.status);
        }
    } else {
        ctx.reporter.on_run_planned(RunPlanned {
            run_id: group_run_id.to_string(),
            planned_node_count: request.suite.test_cases.len() * request.controls.effective_repeat() as usize,
        });

        if request.controls.max_parallel > 1 {
            emit_event(&events_log, backoff, ctx.reporter, EventRecord::new(EventSeverity::Warning, CODE_MAX_PARALLEL_IGNORED, group_run_id, "maxParallel > 1 is downgraded to sequential execution"))?;
        }
    }

    let mut stopped_at: Option<(u32, usize)> = None;
    let mut aborted = false;

    'iterations: for iteration in 0..request.controls.effective_repeat() {
        for (node_index, node) in request.suite.test_cases.iter().enumerate() {
            if let Some(resume_point) = resume_point {
                if (iteration, node_index) < resume_point {
                    continue;
                }
            }

            if *abort.borrow_and_update() {
                aborted = true;
                break 'iterations;
            }

            let is_resume_point = resume_point == Some((iteration, node_index));
            let node_display_id = display_node_id(&node.node_id, iteration, request.controls.effective_repeat());
            let resolved = resolve_node_case(ctx.discovery, &ctx.roots.cases_root, node)?;

            let declared: BTreeMap<String, Value> = node.inputs.clone();
            let mut overrides = declared;
            if let Some(node_override) = request.node_overrides.get(&node.node_id) {
                overrides.extend(node_override.inputs.clone());
            }
            let mut resolved_inputs = resolve_inputs(&resolved.manifest, &overrides)?;
            validate_paths_exist(&resolved.case_dir, &resolved.manifest, &resolved_inputs)?;
            if resolved_inputs.carried_secret_on_command_line {
                let event = EventRecord::new(EventSeverity::Warning, CODE_SECRET_ON_COMMAND_LINE, group_run_id, format!("node {node_display_id} passes a secret-flagged input on the command line")).with_node_id(node_display_id.clone());
                emit_event(&events_log, backoff, ctx.reporter, event)?;
            }

            let argv = pvtx_runner::build_argv(&resolved.manifest.parameters, &resolved_inputs.effective_inputs);
            let effective_inputs_base = std::mem::take(&mut resolved_inputs.effective_inputs);
            let secret_needles = resolved_inputs.secret_needles.clone();
            let timeout = std::time::Duration::from_secs(resolved.manifest.timeout_sec);
            let max_attempts = 1 + request.controls.retry_on_error;

            let final_child_run_id;
            let final_node_status;
            let mut attempt_index: u32 = 1;
            loop {
                let (child_run_id, phase) = if attempt_index == 1 {
                    match (is_resume_point, request.resume.as_ref()) {
                        (true, Some(resume)) => (resume.resumed_run_id.clone(), resume.next_phase),
                        _ => (ctx.manager.mint_run_id(pvtx_runfolder::CASE_RUN_PREFIX), 0),
                    }
                } else {
                    (ctx.manager.mint_run_id(pvtx_runfolder::CASE_RUN_PREFIX), 0)
                };
                let case_dir = ctx.manager.create_case_folder(&child_run_id)?;

                let test_identity = resolved.manifest.identity().map_err(|err| EngineError::InvalidManifest { path: resolved.case_dir.display().to_string(), detail: err.to_string() })?;
                let modules_root = ctx.roots.modules_root();
                let control_dir = case_dir.join("control");
                let predefined = PredefinedContext {
                    test_case_path: &resolved.case_dir,
                    test_case_identity: &test_identity,
                    assets_root: &ctx.roots.assets_root,
                    modules_root: &modules_root,
                    run_id: &child_run_id,
                    phase,
                    control_dir: &control_dir,
                };
                let layers = EnvironmentLayers { plan: request.plan_environment, suite: Some(&request.suite.environment), request_overrides: &request.environment_overrides.env };
                let env = resolve_environment(&layers, &predefined);
                let env_plain: BTreeMap<String, String> = env.iter().map(|(name, value)| (name.clone(), value.expose_for_exec().clone())).collect();

                ctx.reporter.on_node_started(NodeStarted { run_id: child_run_id.clone(), node_id: Some(node_display_id.clone()), attempt: attempt_index });

                let spec = NodeAttemptSpec {
                    case_dir: case_dir.clone(),
                    source_dir: resolved.case_dir.clone(),
                    entry_point: resolved.manifest.script.entry_point.clone(),
                    argv: argv.clone(),
                    env: env_plain,
                    effective_inputs: effective_inputs_base.clone(),
                    timeout,
                    secret_needles: secret_needles.clone(),
                };

                let start_time = Timestamp::now();
                let outcome = run_attempt(&spec, &case_dir.join("stdout.log"), &case_dir.join("stderr.log"), abort.clone()).await.map_err(SuiteRunError::from_runner)?;
                let end_time = Timestamp::now();
                ctx.telemetry.record_node_attempt(outcome.status);

                write_node_artifacts(&case_dir, &resolved.manifest, &node.case_ref, &test_identity, &spec, &outcome, request, &node_display_id, start_time, end_time)?;

                let attempt_status = if *abort.borrow() { outcome.status.force_aborted() } else { outcome.status };
                let entry = IndexEntry {
                    run_id: child_run_id.clone(),
                    run_type: RunKind::SuiteNode,
                    node_id: Some(node_display_id.clone()),
                    test_id: Some(test_identity.id().to_string()),
                    test_version: Some(test_identity.version().to_string()),
                    suite_id: Some(request.suite_identity.id().to_string()),
                    suite_version: Some(request.suite_identity.version().to_string()),
                    plan_id: request.plan_identity.map(|identity| identity.id().to_string()),
                    plan_version: request.plan_identity.map(|identity| identity.version().to_string()),
                    parent_run_id: Some(group_run_id.to_string()),
                    start_time,
                    end_time,
                    status: attempt_status,
                };
                record_node_outcome(ctx.manager, &children_log, &events_log, backoff, &entry, &[], ctx.reporter)?;

                if let Some(reboot) = outcome.reboot.clone() {
                    let event = EventRecord::new(EventSeverity::Info, CODE_TEST_CASE_REBOOT_REQUESTED, group_run_id, format!("node {node_display_id} requested reboot: {}", reboot.reason)).with_node_id(node_display_id.clone());
                    emit_event(&events_log, backoff, ctx.reporter, event)?;

                    child_run_ids.push(child_run_id.clone());
                    node_statuses.push(attempt_status);

                    let env_secrets: BTreeMap<String, Secret<String>> = env.clone();
                    let case_resume = CaseResumeContext {
                        run_id: child_run_id.clone(),
                        test_id: test_identity.id().to_string(),
                        test_version: test_identity.version().to_string(),
                        node_id: Some(node_display_id.clone()),
                        phase: predefined.phase,
                        effective_inputs: spec.effective_inputs.clone(),
                        effective_environment: env_secrets,
                    };
                    let suite_ref = format!("{}@{}", request.suite_identity.id(), request.suite_identity.version());
                    let suspend_request = SuspendRequest {
                        run_id: group_run_id,
                        entity_type: EntityResumeState::TestSuite,
                        next_phase: reboot.next_phase,
                        current_node_index: Some(node_index),
                        current_child_run_id: Some(case_resume.run_id.clone()),
                        current_iteration: Some(iteration),
                        case_resume: Some(case_resume),
                        target_ref: Some(&suite_ref),
                        delay_sec: reboot.delay_sec,
                        resume_count: ctx.resume_count,
                    };
                    suspend_for_reboot(ctx.roots, ctx.platform, suspend_request)?;

                    let mut counts = Counts::default();
                    for status in &node_statuses {
                        counts.record(*status);
                    }
                    let result = GroupResult {
                        schema_version: pvtx_contract::result::RESULT_SCHEMA_VERSION,
                        run_type: GroupRunType::Suite,
                        suite_id: Some(request.suite_identity.id().to_string()),
                        suite_version: Some(request.suite_identity.version().to_string()),
                        plan_id: request.plan_identity.map(|identity| identity.id().to_string()),
                        plan_version: request.plan_identity.map(|identity| identity.version().to_string()),
                        status: Status::RebootRequired,
                        start_time: group_start_time,
                        end_time: Timestamp::now(),
                        counts,
                        child_run_ids,
                        message: None,
                        reboot: Some(reboot),
                    };
                    ctx.reporter.on_run_finished(RunFinished { run_id: group_run_id.to_string(), status: Status::RebootRequired });
                    return Ok(result);
                }

                let exhausted = attempt_index >= max_attempts;
                if attempt_status.is_retryable() && !exhausted && !*abort.borrow() {
                    ctx.telemetry.record_retry();
                    attempt_index += 1;
                    continue;
                }

                final_child_run_id = child_run_id;
                final_node_status = attempt_status;
                break;
            }
            child_run_ids.push(final_child_run_id);
            node_statuses.push(final_node_status);

            if !request.controls.continue_on_failure && !final_node_status.is_passed() {
                stopped_at = Some((iteration, node_index + 1));
                break;
            }
        }
        if let Some((stopped_iteration, stopped_node_index)) = stopped_at {
            emit_skip_events(&events_log, backoff, ctx.reporter, group_run_id, request, stopped_iteration, stopped_node_index)?;
            break;
        }
    }

    let end_time = Timestamp::now();
    let mut aggregate = Status::aggregate(node_statuses.iter().copied());
    if aborted {
        aggregate = aggregate.force_aborted();
    }
    let mut counts = Counts::default();
    for status in &node_statuses {
        counts.record(*status);
    }

    let result = GroupResult {
        schema_version: pvtx_contract::result::RESULT_SCHEMA_VERSION,
        run_type: GroupRunType::Suite,
        suite_id: Some(request.suite_identity.id().to_string()),
        suite_version: Some(request.suite_identity.version().to_string()),
        plan_id: request.plan_identity.map(|identity| identity.id().to_string()),
        plan_version: request.plan_identity.map(|identity| identity.version().to_string()),
        status: aggregate,
        start_time: group_start_time,
        end_time,
        counts,
        child_run_ids,
        message: None,
        reboot: None,
    };
    write_json_atomic(&group_dir.join("result.json"), &result).map_err(|err| SuiteRunError::Io(std::io::Error::other(err.to_string())))?;
    ctx.reporter.on_run_finished(RunFinished { run_id: group_run_id.to_string(), status: aggregate });
    Ok(result)
}

impl SuiteRunError {
    /// Converts a runner-level spawn failure into a [`SuiteRunError`],
    /// kept as a named conversion since [`pvtx_runner::RunnerError`] is
    /// not `From`-convertible without naming its crate at every call site.
    fn from_runner(source: pvtx_runner::RunnerError) -> Self {
        Self::Io(std::io::Error::other(source.to_string()))
    }
}

/// Rejects any `node_overrides` key that does not name a node the suite
/// actually declares, per the specification's `RunRequest.UnknownNodeId`
/// validation code. Without this check a typo'd or stale override key is
/// silently dropped by `request.node_overrides.get(&node.node_id)` at
/// dispatch time instead of being reported to the caller.
fn validate_node_overrides(suite: &TestSuiteManifest, node_overrides: &BTreeMap<String, NodeOverride>) -> Result<(), SuiteRunError> {
    for node_id in node_overrides.keys() {
        if !suite.test_cases.iter().any(|node| &node.node_id == node_id) {
            return Err(SuiteRunError::Engine(EngineError::RunRequestUnknownNodeId { node_id: node_id.clone() }));
        }
    }
    Ok(())
}

/// Collapses `entries` (one line per node attempt, in first-seen order) to
/// one entry per `node_id`: the last attempt recorded for each node, since
/// a retried node's earlier attempts must not inflate the suite's aggregate
/// counts once resumed. Keyed by `run_id` when an entry carries no
/// `node_id` (never the case for a suite node, but kept total).
fn latest_attempt_per_node(entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: BTreeMap<String, IndexEntry> = BTreeMap::new();
    for entry in entries {
        let key = entry.node_id.clone().unwrap_or_else(|| entry.run_id.clone());
        if !latest.contains_key(&key) {
            order.push(key.clone());
        }
        latest.insert(key, entry);
    }
    order.into_iter().filter_map(|key| latest.remove(&key)).collect()
}

/// Builds the run-folder-facing node id: the declared node id, suffixed
/// with the one-based iteration number only when the suite repeats more
/// than once.
fn display_node_id(node_id: &str, iteration: u32, effective_repeat: u32) -> String {
    if effective_repeat > 1 { format!("{node_id}_{}", iteration + 1) } else { node_id.to_string() }
}

/// Appends one event to `events_log` and notifies `reporter`.
fn emit_event(events_log: &AppendLog, backoff: &[u64], reporter: &dyn Reporter, event: EventRecord) -> Result<(), SuiteRunError> {
    let line = serde_json::to_string(&event).map_err(|err| SuiteRunError::Io(std::io::Error::other(err.to_string())))?;
    events_log.append_line(&line, backoff).map_err(|err| SuiteRunError::Io(std::io::Error::other(err.to_string())))?;
    reporter.on_event(&event);
    Ok(())
}

/// Emits one [`CODE_SUITE_NODE_SKIPPED`] event for every node left
/// undispatched after `continueOnFailure: false` stopped the walk:
/// the remainder of `stopped_iteration` starting at `stopped_node_index`,
/// and every node of every iteration after it.
fn emit_skip_events(events_log: &AppendLog, backoff: &[u64], reporter: &dyn Reporter, run_id: &str, request: &SuiteRunRequest<'_>, stopped_iteration: u32, stopped_node_index: usize) -> Result<(), SuiteRunError> {
    for iteration in stopped_iteration..request.controls.effective_repeat() {
        let start_index = if iteration == stopped_iteration { stopped_node_index } else { 0 };
        for node in request.suite.test_cases.iter().skip(start_index) {
            let node_display_id = display_node_id(&node.node_id, iteration, request.controls.effective_repeat());
            let message = format!("node {node_display_id} skipped after continueOnFailure stopped the suite");
            emit_event(events_log, backoff, reporter, EventRecord::new(EventSeverity::Info, CODE_SUITE_NODE_SKIPPED, run_id, message).with_node_id(node_display_id))?;
        }
    }
    Ok(())
}

/// Writes a node's run folder artifacts: the full manifest snapshot, the
/// resolved parameters snapshot, the resolved environment snapshot, and
/// the case result.
#[allow(clippy::too_many_arguments, reason = "mirrors the fixed set of facts a node's run folder snapshot needs; splitting it would just move the same fields into a builder")]
fn write_node_artifacts(case_dir: &Path, manifest: &pvtx_core::TestCaseManifest, case_ref: &str, test_identity: &Identity, spec: &NodeAttemptSpec, outcome: &pvtx_runner::CaseOutcome, request: &SuiteRunRequest<'_>, node_display_id: &str, start_time: Timestamp, end_time: Timestamp) -> Result<(), SuiteRunError> {
    let env_secrets: BTreeMap<String, Secret<String>> = spec.env.iter().map(|(name, value)| (name.clone(), Secret::plain(value.clone()))).collect();
    crate::snapshot::write_manifest_snapshot(case_dir, manifest, case_ref, test_identity, &env_secrets, &spec.effective_inputs, start_time).map_err(to_io)?;
    pvtx_runner::write_params_snapshot(case_dir, &spec.effective_inputs).map_err(to_io)?;
    pvtx_runner::write_env_snapshot(case_dir, &env_secrets).map_err(to_io)?;

    let context = ResultContext {
        node_id: Some(node_display_id.to_string()),
        suite_id: Some(request.suite_identity.id().to_string()),
        suite_version: Some(request.suite_identity.version().to_string()),
        plan_id: request.plan_identity.map(|identity| identity.id().to_string()),
        plan_version: request.plan_identity.map(|identity| identity.version().to_string()),
    };
    let result = pvtx_runner::build_case_result(manifest, &context, outcome.status, start_time, end_time, outcome.exit_code, spec.effective_inputs.clone(), outcome.error.clone(), None, outcome.reboot.clone());
    pvtx_runner::write_result(case_dir, &result).map_err(to_io)
}

/// Converts a [`pvtx_runfolder::WriteError`] into a [`SuiteRunError`].
fn to_io(source: pvtx_runfolder::WriteError) -> SuiteRunError {
    SuiteRunError::Io(std::io::Error::other(source.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvtx_core::manifest::SuiteNode;

    fn manifest_with_nodes(node_ids: &[&str]) -> TestSuiteManifest {
        TestSuiteManifest {
            id: "Suite1".to_string(),
            version: "1.0.0".to_string(),
            test_cases: node_ids
                .iter()
                .map(|node_id| SuiteNode { node_id: (*node_id).to_string(), case_ref: "Case1".to_string(), inputs: BTreeMap::new() })
                .collect(),
            controls: SuiteControls::default(),
            environment: pvtx_core::manifest::SuiteEnvironment::default(),
        }
    }

    #[test]
    fn validate_node_overrides_accepts_declared_node_id() {
        let suite = manifest_with_nodes(&["Node1", "Node2"]);
        let overrides = BTreeMap::from([("Node1".to_string(), NodeOverride { inputs: BTreeMap::new() })]);
        assert!(validate_node_overrides(&suite, &overrides).is_ok());
    }

    #[test]
    fn validate_node_overrides_rejects_unknown_node_id() {
        let suite = manifest_with_nodes(&["Node1"]);
        let overrides = BTreeMap::from([("Ghost".to_string(), NodeOverride { inputs: BTreeMap::new() })]);
        let err = validate_node_overrides(&suite, &overrides).expect_err("unknown node id must be rejected");
        match err {
            SuiteRunError::Engine(EngineError::RunRequestUnknownNodeId { node_id }) => assert_eq!(node_id, "Ghost"),
            other => panic!("expected RunRequestUnknownNodeId, got {other:?}"),
        }
    }

    #[test]
    fn latest_attempt_per_node_keeps_last_and_drops_retries() {
        let base = IndexEntry {
            run_id: String::new(),
            run_type: RunKind::TestCase,
            node_id: Some("Node1".to_string()),
            test_id: None,
            test_version: None,
            suite_id: None,
            suite_version: None,
            plan_id: None,
            plan_version: None,
            parent_run_id: None,
            start_time: Timestamp::now(),
            end_time: Timestamp::now(),
            status: Status::Failed,
        };
        let attempt1 = IndexEntry { run_id: "R1".to_string(), ..base.clone() };
        let attempt2 = IndexEntry { run_id: "R2".to_string(), status: Status::Passed, ..base };
        let collapsed = latest_attempt_per_node(vec![attempt1, attempt2]);
        assert_eq!(collapsed.len(), 1);
        assert_eq!(collapsed[0].run_id, "R2");
        assert_eq!(collapsed[0].status, Status::Passed);
    }
}
