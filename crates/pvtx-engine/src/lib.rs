// crates/pvtx-engine/src/lib.rs
// ============================================================================
// Crate: pvtx-engine
// Description: Orchestration core for PVT-X: input/environment resolution,
//              the suite/plan state machines, the reboot/resume
//              subsystem, and the reporter/telemetry seams every host
//              (CLI, service) observes a run through.
// Purpose: Turn a validated `RunRequest` into a terminal run folder, ready
//          for a CLI or any other host to format for a human.
// Dependencies: pvtx-core, pvtx-contract, pvtx-config, pvtx-discovery,
//               pvtx-runfolder, pvtx-runner
// ============================================================================

//! ## Overview
//! [`Engine::run`] is the one entry point every host calls: it validates
//! the request's shape, mints a top-level run id, and dispatches to
//! [`case::run_case`], [`suite::run_suite`], or [`plan::run_plan`]
//! depending on [`pvtx_core::RunTarget`]. Every other module in this
//! crate exists to support that dispatch: [`inputs`] and [`env`] resolve
//! what a case actually runs with, [`node`] resolves and retries one
//! case attempt, [`record`] is the single sink an outcome is written
//! through, and [`reporter`]/[`telemetry`] are the observation seams.

#![doc(html_no_source)]

pub mod case;
pub mod env;
pub mod inputs;
pub mod node;
pub mod plan;
pub mod record;
pub mod reporter;
pub mod resume;
pub mod snapshot;
pub mod suite;
pub mod telemetry;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use pvtx_config::EngineLimits;
use pvtx_config::PlatformAdapter;
use pvtx_config::Roots;
use pvtx_core::EngineError;
use pvtx_core::Identity;
use pvtx_core::RunRequest;
use pvtx_core::RunTarget;
use pvtx_core::request::RunRequestShapeError;
use pvtx_discovery::DiscoveryIndex;
use pvtx_runfolder::CASE_RUN_PREFIX;
use pvtx_runfolder::PLAN_RUN_PREFIX;
use pvtx_runfolder::RunFolderManager;
use pvtx_runfolder::SUITE_RUN_PREFIX;
use tokio::sync::watch;

use crate::case::CaseRunError;
use crate::case::run_case;
use crate::plan::PlanResume;
use crate::plan::PlanRunError;
use crate::plan::PlanRunRequest;
use crate::plan::run_plan;
use crate::reporter::Reporter;
use crate::suite::EngineContext;
use crate::suite::SuiteResume;
use crate::suite::SuiteRunError;
use crate::suite::SuiteRunRequest;
use crate::suite::run_suite;
use crate::telemetry::Telemetry;

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Owns the collaborators a run needs: resolved filesystem roots, tunable
/// limits, the discovery index built from those roots, and the run folder
/// manager that mints run ids and writes the shared `index.jsonl`.
pub struct Engine {
    /// Resolved filesystem roots.
    roots: Roots,
    /// Tunable engine limits.
    limits: EngineLimits,
    /// The case/suite/plan discovery index, built once at construction.
    discovery: DiscoveryIndex,
    /// The run folder manager.
    manager: RunFolderManager,
    /// Platform abstraction for scheduling and issuing a reboot.
    platform: Box<dyn PlatformAdapter>,
}

/// Failure dispatching or running a validated request.
#[derive(Debug, thiserror::Error)]
pub enum EngineRunError {
    /// The request failed its own shape invariants before dispatch.
    #[error(transparent)]
    Shape(#[from] RunRequestShapeError),
    /// The requested target could not be resolved or read.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// A standalone case run failed.
    #[error(transparent)]
    Case(#[from] CaseRunError),
    /// A suite run failed.
    #[error(transparent)]
    Suite(#[from] SuiteRunError),
    /// A plan run failed.
    #[error(transparent)]
    Plan(#[from] PlanRunError),
}

impl Engine {
    /// Builds an engine by walking `roots` for every case/suite/plan
    /// manifest and constructing the run folder manager over
    /// `roots.runs_root`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when discovery finds a duplicate identity
    /// or an unreadable manifest.
    pub fn new(roots: Roots, limits: EngineLimits, platform: Box<dyn PlatformAdapter>) -> Result<Self, EngineError> {
        let discovery = DiscoveryIndex::build(&roots.cases_root, &roots.suites_root, &roots.plans_root)?;
        let manager = RunFolderManager::new(roots.runs_root.clone());
        Ok(Self { roots, limits, discovery, manager, platform })
    }

    /// Returns the discovery index built at construction, for a host that
    /// wants to list or validate cases/suites/plans without running one.
    #[must_use]
    pub const fn discovery(&self) -> &DiscoveryIndex {
        &self.discovery
    }

    /// Returns the resolved filesystem roots this engine was built over.
    #[must_use]
    pub const fn roots(&self) -> &Roots {
        &self.roots
    }

    /// Validates and dispatches `request`, returning the minted top-level
    /// run id and the run's terminal status.
    ///
    /// # Errors
    ///
    /// Returns [`EngineRunError`] when the request's shape is invalid, its
    /// target cannot be resolved, or the dispatched run itself fails. A
    /// case/node script's own failure is captured as a terminal status
    /// inside the run folder, never as an `Err` here.
    pub async fn run(&self, request: &RunRequest, reporter: &dyn Reporter, telemetry: &dyn Telemetry, abort: watch::Receiver<bool>) -> Result<RunOutcome, EngineRunError> {
        request.validate_shape()?;
        let ctx = EngineContext { roots: &self.roots, limits: &self.limits, discovery: &self.discovery, manager: &self.manager, reporter, telemetry, platform: self.platform.as_ref(), resume_count: 0 };

        match &request.target {
            RunTarget::TestCase { test_case } => {
                let run_id = self.manager.mint_run_id(CASE_RUN_PREFIX);
                let result = run_case(&ctx, test_case, &request.case_inputs, &request.environment_overrides, &run_id, None, abort).await?;
                Ok(RunOutcome { run_id, status: result.status })
            }
            RunTarget::Suite { suite } => {
                let identity = Identity::parse(suite).map_err(|_err| EngineError::SuiteTestCaseRefInvalid { case_ref: suite.clone(), reason: pvtx_core::RefInvalidReason::NotFound })?;
                let entry = self.discovery.suite(&identity).ok_or_else(|| EngineError::SuiteTestCaseRefInvalid { case_ref: suite.clone(), reason: pvtx_core::RefInvalidReason::NotFound })?;
                let run_id = self.manager.mint_run_id(SUITE_RUN_PREFIX);
                let suite_request = SuiteRunRequest {
                    suite: &entry.manifest,
                    suite_identity: &identity,
                    controls: entry.manifest.controls.clone(),
                    node_overrides: &request.node_overrides,
                    environment_overrides: &request.environment_overrides,
                    plan_environment: None,
                    plan_identity: None,
                    parent_run_id: None,
                    resume: None,
                };
                let result = run_suite(&ctx, &suite_request, &run_id, abort).await?;
                Ok(RunOutcome { run_id, status: result.status })
            }
            RunTarget::Plan { plan } => {
                let identity = Identity::parse(plan).map_err(|_err| EngineError::SuiteTestCaseRefInvalid { case_ref: plan.clone(), reason: pvtx_core::RefInvalidReason::NotFound })?;
                let entry = self.discovery.plan(&identity).ok_or_else(|| EngineError::SuiteTestCaseRefInvalid { case_ref: plan.clone(), reason: pvtx_core::RefInvalidReason::NotFound })?;
                let run_id = self.manager.mint_run_id(PLAN_RUN_PREFIX);
                let plan_request = PlanRunRequest { plan: &entry.manifest, plan_identity: &identity, environment_overrides: &request.environment_overrides, resume: None };
                let result = run_plan(&ctx, &plan_request, &run_id, abort).await?;
                Ok(RunOutcome { run_id, status: result.status })
            }
        }
    }

    /// Resumes a session a prior process suspended for a reboot:
    /// validates `token` against the persisted session, re-enters the
    /// appropriate orchestrator at its saved phase/node index, and
    /// returns the run's outcome once the resumed attempt finishes (or
    /// suspends for another reboot, which the caller observes as
    /// `RunOutcome::status == RebootRequired` again).
    ///
    /// A node may request at most one reboot total: a session already
    /// resumed once is finalized as [`pvtx_core::Status::Error`] instead
    /// of being re-entered, per [`crate::resume::advance_resume`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineResumeError`] when the session cannot be read,
    /// the token does not match, the session names an undiscoverable
    /// suite/plan, or the resumed orchestrator itself fails.
    pub async fn resume(&self, run_id: &str, token: &str, reporter: &dyn Reporter, telemetry: &dyn Telemetry, abort: watch::Receiver<bool>) -> Result<RunOutcome, EngineResumeError> {
        let session = resume::load_session(&self.roots.runs_root, run_id)?;
        if session.resume_token != token {
            return Err(EngineResumeError::TokenMismatch);
        }

        let (decision, event) = resume::advance_resume(&session, &self.limits);
        let session = match decision {
            resume::ResumeDecision::Exhausted(finalized) => {
                if let Some(event) = event {
                    reporter.on_event(&event);
                }
                return Ok(RunOutcome { run_id: finalized.run_id, status: pvtx_core::Status::Error });
            }
            resume::ResumeDecision::Continue(session) => session,
        };
        resume::persist_session(&self.roots.runs_root, &session)?;

        let ctx = EngineContext { roots: &self.roots, limits: &self.limits, discovery: &self.discovery, manager: &self.manager, reporter, telemetry, platform: self.platform.as_ref(), resume_count: session.resume_count };

        match session.entity_type {
            pvtx_contract::session::EntityResumeState::TestCase => {
                let case_resume = session.case_resume.as_ref().ok_or(EngineResumeError::MissingCaseContext)?;
                let case_ref = format!("{}@{}", case_resume.test_id, case_resume.test_version);
                let empty_overrides = pvtx_core::request::EnvironmentOverrides::default();
                let result = run_case(&ctx, &case_ref, &BTreeMap::new(), &empty_overrides, &session.run_id, Some(session.next_phase), abort).await?;
                Ok(RunOutcome { run_id: session.run_id, status: result.status })
            }
            pvtx_contract::session::EntityResumeState::TestSuite => {
                let suite_ref = session.target_ref.as_deref().ok_or(EngineResumeError::MissingTargetRef)?;
                let identity = Identity::parse(suite_ref).map_err(|_err| EngineResumeError::MissingTargetRef)?;
                let entry = self.discovery.suite(&identity).ok_or(EngineResumeError::UndiscoverableTarget { target_ref: suite_ref.to_string() })?;
                let resumed_run_id = session.current_child_run_id.clone().ok_or(EngineResumeError::MissingCaseContext)?;
                let suite_resume = SuiteResume {
                    start_iteration: session.current_iteration.unwrap_or(0),
                    start_node_index: session.current_node_index.unwrap_or(0),
                    next_phase: session.next_phase,
                    resumed_run_id,
                };
                let empty_overrides = pvtx_core::request::EnvironmentOverrides::default();
                let empty_node_overrides = BTreeMap::new();
                let suite_request = SuiteRunRequest {
                    suite: &entry.manifest,
                    suite_identity: &identity,
                    controls: entry.manifest.controls.clone(),
                    node_overrides: &empty_node_overrides,
                    environment_overrides: &empty_overrides,
                    plan_environment: None,
                    plan_identity: None,
                    parent_run_id: None,
                    resume: Some(suite_resume),
                };
                let result = run_suite(&ctx, &suite_request, &session.run_id, abort).await?;
                Ok(RunOutcome { run_id: session.run_id, status: result.status })
            }
            pvtx_contract::session::EntityResumeState::TestPlan => {
                let plan_ref = session.target_ref.as_deref().ok_or(EngineResumeError::MissingTargetRef)?;
                let identity = Identity::parse(plan_ref).map_err(|_err| EngineResumeError::MissingTargetRef)?;
                let entry = self.discovery.plan(&identity).ok_or(EngineResumeError::UndiscoverableTarget { target_ref: plan_ref.to_string() })?;
                let suite_run_id = session.current_child_run_id.clone().ok_or(EngineResumeError::MissingCaseContext)?;
                let suite_session = resume::load_session(&self.roots.runs_root, &suite_run_id)?;
                let suite_resumed_run_id = suite_session.current_child_run_id.clone().ok_or(EngineResumeError::MissingCaseContext)?;
                let plan_resume = PlanResume {
                    start_suite_index: session.current_node_index.unwrap_or(0),
                    suite_run_id,
                    suite_resume: SuiteResume {
                        start_iteration: suite_session.current_iteration.unwrap_or(0),
                        start_node_index: suite_session.current_node_index.unwrap_or(0),
                        next_phase: suite_session.next_phase,
                        resumed_run_id: suite_resumed_run_id,
                    },
                };
                let empty_overrides = pvtx_core::request::EnvironmentOverrides::default();
                let plan_request = PlanRunRequest { plan: &entry.manifest, plan_identity: &identity, environment_overrides: &empty_overrides, resume: Some(plan_resume) };
                let result = run_plan(&ctx, &plan_request, &session.run_id, abort).await?;
                Ok(RunOutcome { run_id: session.run_id, status: result.status })
            }
        }
    }
}

/// Failure resuming a session a prior process suspended for a reboot.
#[derive(Debug, thiserror::Error)]
pub enum EngineResumeError {
    /// The session file could not be read, parsed, or rescheduled.
    #[error(transparent)]
    Resume(#[from] resume::ResumeError),
    /// The presented `--token` did not match the persisted session's
    /// `resume_token`.
    #[error("resume token does not match the session on disk")]
    TokenMismatch,
    /// A `TestCase` session had no `case_resume` context, which should
    /// never happen for a session written by [`case::run_case`].
    #[error("session is missing its case resume context")]
    MissingCaseContext,
    /// A `TestSuite`/`TestPlan` session had no `target_ref`, which should
    /// never happen for a session written by [`suite::run_suite`] or
    /// [`plan::run_plan`].
    #[error("session is missing the suite/plan identity it was suspended against")]
    MissingTargetRef,
    /// The session's `target_ref` no longer resolves against the
    /// discovery index (the manifest was moved or deleted since
    /// suspension).
    #[error("session target {target_ref:?} is no longer discoverable")]
    UndiscoverableTarget {
        /// The unresolved `id@version` reference.
        target_ref: String,
    },
    /// A standalone case run failed.
    #[error(transparent)]
    Case(#[from] CaseRunError),
    /// A suite run failed.
    #[error(transparent)]
    Suite(#[from] SuiteRunError),
    /// A plan run failed.
    #[error(transparent)]
    Plan(#[from] PlanRunError),
}

/// The minimal outcome a host needs from [`Engine::run`]: the minted run
/// id (the key into the run folder) and the run's terminal status. Full
/// detail always lives in the run folder's `result.json`, not here.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The minted top-level run id.
    pub run_id: String,
    /// The run's aggregate terminal status.
    pub status: pvtx_core::Status,
}
