// crates/pvtx-contract/src/session.rs
// ============================================================================
// Module: Session Persistence
// Description: `session.json` shape written by an orchestrator before a
//              reboot and read back on resume.
// Purpose: Carry enough state across an OS reboot to re-enter the
//          suspended orchestrator at the correct node, phase and iteration.
// Dependencies: pvtx-core, serde_json
// ============================================================================

//! ## Overview
//! Every orchestrator level (case, suite, plan) that sees a
//! [`crate::reboot::RebootInfo`] bubble up from a child writes a
//! `session.json` into its own run folder before exiting the process. On
//! resume, the CLI loads the top-level session, validates the resume token,
//! and re-enters the orchestrator at `next_phase` / `current_node_index`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use pvtx_core::Secret;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Entity Kind
// ============================================================================

/// Which orchestrator level a [`SessionFile`] was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityResumeState {
    /// A standalone or suite-leaf case run.
    TestCase,
    /// A suite group run.
    TestSuite,
    /// A plan group run.
    TestPlan,
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// Lifecycle state of a persisted session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SessionState {
    /// Waiting for a resumed attempt to pick this run back up.
    PendingResume,
    /// Resumed more than once; the run is closed out as `Error`.
    Finalized,
}

// ============================================================================
// SECTION: Roots Snapshot
// ============================================================================

/// A snapshot of the configured filesystem roots at the moment a session
/// was persisted, so a resumed process need not re-read configuration that
/// may since have changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsSnapshot {
    /// Root directory containing test-case manifests.
    pub cases_root: PathBuf,
    /// Root directory containing suite manifests.
    pub suites_root: PathBuf,
    /// Root directory containing plan manifests.
    pub plans_root: PathBuf,
    /// Root directory containing shared assets (scripts, modules).
    pub assets_root: PathBuf,
    /// Root directory containing run folders.
    pub runs_root: PathBuf,
}

// ============================================================================
// SECTION: Case Resume Context
// ============================================================================

/// The full resolved context of a suspended case leaf, persisted so the
/// resumed attempt need not re-run input/environment resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResumeContext {
    /// Run id of the suspended case.
    pub run_id: String,
    /// Test-case id.
    pub test_id: String,
    /// Test-case version.
    pub test_version: String,
    /// Suite node id, present when the case was suite-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<String>,
    /// Phase the case was suspended at.
    pub phase: u32,
    /// Effective inputs resolved before suspension, redacted.
    pub effective_inputs: BTreeMap<String, Secret<Value>>,
    /// Effective environment variables resolved before suspension,
    /// redacted.
    pub effective_environment: BTreeMap<String, Secret<String>>,
}

// ============================================================================
// SECTION: Session File
// ============================================================================

/// `session.json` written by an orchestrator before a reboot.
///
/// # Invariants
/// - `current_iteration` is only meaningful when `entity_type ==
///   EntityResumeState::TestSuite`; other levels leave it `None`.
/// - `case_resume` is present iff the suspended leaf was a case run.
/// - `resume_count` starts at 0 and is incremented once per resume attempt;
///   a value greater than 1 forces `state = SessionState::Finalized` and the
///   owning run's status to `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    /// Run id of the orchestrator level that wrote this session.
    pub run_id: String,
    /// Which orchestrator level wrote this session.
    pub entity_type: EntityResumeState,
    /// Lifecycle state.
    pub state: SessionState,
    /// One-based phase to resume at.
    pub next_phase: u32,
    /// Opaque resume token the CLI must present to resume this run.
    pub resume_token: String,
    /// Number of resume attempts made against this session so far.
    pub resume_count: u32,
    /// Index of the node the suite/plan was suspended at.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_node_index: Option<usize>,
    /// Run id of the in-flight child at suspension time.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_child_run_id: Option<String>,
    /// Repeat-iteration count, meaningful for suite sessions only.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub current_iteration: Option<u32>,
    /// Resolved context of the suspended case leaf, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub case_resume: Option<CaseResumeContext>,
    /// `id@version` identity of the suite or plan this session belongs to.
    /// `None` for a `TestCase` session, whose identity is already carried
    /// by `case_resume`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub target_ref: Option<String>,
    /// Filesystem roots in effect when this session was written.
    pub roots: RootsSnapshot,
}

impl SessionFile {
    /// Returns true once this session has already been resumed (`
    /// resume_count > 0`), meaning a further resume attempt must finalize
    /// it as `Error` instead of re-entering the orchestrator.
    #[must_use]
    pub const fn exceeds_single_resume(&self) -> bool {
        self.resume_count > 0
    }

    /// Returns a copy of this session with `resume_count` incremented and,
    /// when that now exceeds one resume, `state` forced to `Finalized`.
    #[must_use]
    pub fn advance_resume(&self) -> Self {
        let mut next = self.clone();
        next.resume_count += 1;
        if next.resume_count > 1 {
            next.state = SessionState::Finalized;
        }
        next
    }
}
