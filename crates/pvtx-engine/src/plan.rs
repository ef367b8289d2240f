// crates/pvtx-engine/src/plan.rs
// ============================================================================
// Module: Plan Orchestrator
// Description: Runs a test plan's suites in declared order, threading the
//              plan's environment and a plan-level control override into
//              each suite run.
// Purpose: Own the plan-level state machine so a plan run is one call that
//          returns a terminal status built from its suites' own group
//          results.
// Dependencies: pvtx-core, pvtx-contract, pvtx-discovery, pvtx-runfolder
// ============================================================================

//! ## Overview
//! A plan run walks `test_suites` in declared order. Each entry's own
//! `controls`, when present, overrides the referenced suite's declared
//! controls via [`pvtx_core::manifest::SuiteControls::merge_plan_override`].
//! A plan run never carries per-node or per-case input overrides — the
//! request shape enforces that upstream, and this module re-asserts it so
//! the orchestrator never silently drops an override it was never
//! supposed to receive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pvtx_contract::Counts;
use pvtx_contract::GroupResult;
use pvtx_contract::GroupRunType;
use pvtx_core::EngineError;
use pvtx_core::Identity;
use pvtx_core::Status;
use pvtx_core::Timestamp;
use pvtx_core::manifest::TestPlanManifest;
use pvtx_core::request::EnvironmentOverrides;
use pvtx_discovery::DiscoveryIndex;
use pvtx_discovery::SuiteEntry;
use pvtx_runfolder::ChildrenReadError;
use pvtx_runfolder::SUITE_RUN_PREFIX;
use pvtx_runfolder::reconstruct_children_ordered;
use pvtx_runfolder::write_json_atomic;
use std::collections::BTreeMap;
use tokio::sync::watch;

use crate::reporter::RunFinished;
use crate::reporter::RunPlanned;
use crate::resume::ResumeError;
use crate::resume::SuspendRequest;
use crate::resume::suspend_for_reboot;
use crate::suite::EngineContext;
use crate::suite::SuiteResume;
use crate::suite::SuiteRunError;
use crate::suite::SuiteRunRequest;
use crate::suite::run_suite;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Failure running a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanRunError {
    /// A plan suite entry's `node_id`/`ref_hint` named neither a
    /// discovered suite identity.
    #[error("plan suite entry {entry:?} does not resolve to a discovered suite")]
    SuiteRefInvalid {
        /// The `node_id` (or `ref_hint`, when present) that failed to
        /// resolve.
        entry: String,
    },
    /// A referenced suite's own identity could not be parsed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A suite run nested inside this plan failed.
    #[error(transparent)]
    Suite(#[from] SuiteRunError),
    /// The plan's own run folder write failed.
    #[error("run folder I/O failed: {0}")]
    Io(#[source] std::io::Error),
    /// A nested suite requested a reboot but the plan-level session
    /// could not be persisted or the platform adapter refused to
    /// schedule/issue it.
    #[error(transparent)]
    Resume(#[from] ResumeError),
}

impl From<std::io::Error> for PlanRunError {
    fn from(source: std::io::Error) -> Self {
        Self::Io(source)
    }
}

// ============================================================================
// SECTION: Request
// ============================================================================

/// Everything [`run_plan`] needs beyond the shared [`EngineContext`].
pub struct PlanRunRequest<'a> {
    /// The plan manifest being run.
    pub plan: &'a TestPlanManifest,
    /// The plan's parsed identity, stamped into every child result.
    pub plan_identity: &'a Identity,
    /// Request-level environment overrides; legal at every scope,
    /// including a plan run.
    pub environment_overrides: &'a EnvironmentOverrides,
    /// Present when this call is re-entering a plan suspended mid-run
    /// for a reboot, rather than starting it fresh.
    pub resume: Option<PlanResume>,
}

/// Saved progress for a plan resuming after a reboot, carried from the
/// plan's own persisted [`pvtx_contract::SessionFile`] and the in-flight
/// suite's own session underneath it.
pub struct PlanResume {
    /// Index of the suite entry the plan was suspended at.
    pub start_suite_index: usize,
    /// Run id of the in-flight suite at suspension time; reused instead
    /// of minting a fresh one.
    pub suite_run_id: String,
    /// The in-flight suite's own saved progress, forwarded into its
    /// resumed [`SuiteRunRequest`].
    pub suite_resume: SuiteResume,
}

// ============================================================================
// SECTION: Plan Execution
// ============================================================================

/// Runs one plan to completion, returning its aggregate [`GroupResult`].
///
/// # Errors
///
/// Returns [`PlanRunError`] when a suite entry cannot be resolved or a
/// nested suite run itself errors. A suite's own non-passed terminal
/// status is folded into the returned result, never an `Err`.
pub async fn run_plan(ctx: &EngineContext<'_>, request: &PlanRunRequest<'_>, group_run_id: &str, abort: watch::Receiver<bool>) -> Result<GroupResult, PlanRunError> {
    let group_dir = ctx.manager.create_group_folder(group_run_id)?;
    let children_log = pvtx_runfolder::AppendLog::new(group_dir.join("children.jsonl"));
    let backoff = ctx.limits.append_retry_backoff_ms.as_slice();

    let mut child_run_ids = Vec::new();
    let mut suite_statuses = Vec::new();
    let mut plan_start_time = Timestamp::now();

    if request.resume.is_some() {
        let prior = reconstruct_children_ordered(&group_dir.join("children.jsonl")).unwrap_or_else(|err: ChildrenReadError| {
            debug_assert!(matches!(err, ChildrenReadError::Io { .. }), "a malformed children.jsonl should never reach resume");
            Vec::new()
        });
        if let Some(earliest) = prior.first() {
            plan_start_time = earliest.start_time;
        }
        for entry in prior {
            child_run_ids.push(entry.run_id);
            suite_statuses.push(entry.status);
        }
    } else {
        ctx.reporter.on_run_planned(RunPlanned { run_id: group_run_id.to_string(), planned_node_count: request.plan.test_suites.len() });
    }

    for (suite_index, entry) in request.plan.test_suites.iter().enumerate() {
        if let Some(resume) = &request.resume {
            if suite_index < resume.start_suite_index {
                continue;
            }
        }
        if *abort.borrow() {
            break;
        }

        let suite_entry = resolve_plan_suite(ctx.discovery, &entry.node_id, entry.ref_hint.as_deref())?;
        let suite_identity = suite_entry.manifest.identity().map_err(|err| EngineError::InvalidManifest { path: suite_entry.path.display().to_string(), detail: err.to_string() })?;
        let effective_controls = suite_entry.manifest.controls.clone().merge_plan_override(entry.controls.clone().unwrap_or_default());

        let is_resume_point = request.resume.as_ref().is_some_and(|resume| resume.start_suite_index == suite_index);
        let (suite_run_id, nested_resume) = match (is_resume_point, &request.resume) {
            (true, Some(resume)) => (resume.suite_run_id.clone(), Some(resume.suite_resume.clone())),
            _ => (ctx.manager.mint_run_id(SUITE_RUN_PREFIX), None),
        };
        let suite_start_time = Timestamp::now();
        let suite_request = SuiteRunRequest {
            suite: &suite_entry.manifest,
            suite_identity: &suite_identity,
            controls: effective_controls,
            node_overrides: &BTreeMap::new(),
            environment_overrides: request.environment_overrides,
            plan_environment: Some(&request.plan.environment),
            plan_identity: Some(request.plan_identity),
            parent_run_id: Some(group_run_id),
            resume: nested_resume,
        };

        let suite_result = run_suite(ctx, &suite_request, &suite_run_id, abort.clone()).await?;

        if let Some(reboot) = suite_result.reboot.clone() {
            let plan_ref = format!("{}@{}", request.plan_identity.id(), request.plan_identity.version());
            let suspend_request = SuspendRequest {
                run_id: group_run_id,
                entity_type: pvtx_contract::session::EntityResumeState::TestPlan,
                next_phase: reboot.next_phase,
                current_node_index: Some(suite_index),
                current_child_run_id: Some(suite_run_id.clone()),
                current_iteration: None,
                case_resume: None,
                target_ref: Some(&plan_ref),
                delay_sec: reboot.delay_sec,
                resume_count: ctx.resume_count,
            };
            suspend_for_reboot(ctx.roots, ctx.platform, suspend_request)?;

            child_run_ids.push(suite_run_id);
            suite_statuses.push(suite_result.status);
            let mut counts = Counts::default();
            for status in &suite_statuses {
                counts.record(*status);
            }
            let result = GroupResult {
                schema_version: pvtx_contract::result::RESULT_SCHEMA_VERSION,
                run_type: GroupRunType::Plan,
                suite_id: None,
                suite_version: None,
                plan_id: Some(request.plan_identity.id().to_string()),
                plan_version: Some(request.plan_identity.version().to_string()),
                status: Status::RebootRequired,
                start_time: plan_start_time,
                end_time: Timestamp::now(),
                counts,
                child_run_ids,
                message: None,
                reboot: Some(reboot),
            };
            ctx.reporter.on_run_finished(RunFinished { run_id: group_run_id.to_string(), status: Status::RebootRequired });
            return Ok(result);
        }

        let entry_record = pvtx_contract::IndexEntry {
            run_id: suite_run_id.clone(),
            run_type: pvtx_contract::index::RunKind::Suite,
            node_id: Some(entry.node_id.clone()),
            test_id: None,
            test_version: None,
            suite_id: Some(suite_identity.id().to_string()),
            suite_version: Some(suite_identity.version().to_string()),
            plan_id: Some(request.plan_identity.id().to_string()),
            plan_version: Some(request.plan_identity.version().to_string()),
            parent_run_id: Some(group_run_id.to_string()),
            start_time: suite_start_time,
            end_time: Timestamp::now(),
            status: suite_result.status,
        };
        let line = serde_json::to_string(&entry_record).map_err(|err| PlanRunError::Io(std::io::Error::other(err.to_string())))?;
        children_log.append_line(&line, backoff).map_err(|err| PlanRunError::Io(std::io::Error::other(err.to_string())))?;
        ctx.manager.append_index_line(&line, backoff).map_err(|err| PlanRunError::Io(std::io::Error::other(err.to_string())))?;

        suite_statuses.push(suite_result.status);
        child_run_ids.push(suite_run_id);
    }

    let end_time = Timestamp::now();
    let mut aggregate = Status::aggregate(suite_statuses.iter().copied());
    if *abort.borrow() {
        aggregate = aggregate.force_aborted();
    }
    let mut counts = Counts::default();
    for status in &suite_statuses {
        counts.record(*status);
    }

    let result = GroupResult {
        schema_version: pvtx_contract::result::RESULT_SCHEMA_VERSION,
        run_type: GroupRunType::Plan,
        suite_id: None,
        suite_version: None,
        plan_id: Some(request.plan_identity.id().to_string()),
        plan_version: Some(request.plan_identity.version().to_string()),
        status: aggregate,
        start_time: plan_start_time,
        end_time,
        counts,
        child_run_ids,
        message: None,
        reboot: None,
    };
    write_json_atomic(&group_dir.join("result.json"), &result).map_err(|err| PlanRunError::Io(std::io::Error::other(err.to_string())))?;
    ctx.reporter.on_run_finished(RunFinished { run_id: group_run_id.to_string(), status: aggregate });
    Ok(result)
}

/// Resolves a plan suite entry to its discovered suite, trying `node_id`
/// as an `id@version` identity first and `ref_hint` second.
fn resolve_plan_suite<'a>(discovery: &'a DiscoveryIndex, node_id: &str, ref_hint: Option<&str>) -> Result<&'a SuiteEntry, PlanRunError> {
    if let Ok(identity) = Identity::parse(node_id) {
        if let Some(entry) = discovery.suite(&identity) {
            return Ok(entry);
        }
    }
    if let Some(hint) = ref_hint {
        if let Ok(identity) = Identity::parse(hint) {
            if let Some(entry) = discovery.suite(&identity) {
                return Ok(entry);
            }
        }
    }
    Err(PlanRunError::SuiteRefInvalid { entry: ref_hint.unwrap_or(node_id).to_string() })
}
