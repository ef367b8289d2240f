// crates/pvtx-contract/src/index.rs
// ============================================================================
// Module: Global Index Entries
// Description: One `index.jsonl` line at the runs root per completed run.
// Purpose: Give the run-folder manager a single, exact shape for the
//          orchestrator-owned global append log.
// Dependencies: pvtx-core, serde
// ============================================================================

//! ## Overview
//! `index.jsonl` is owned exclusively by the orchestrator layer; the runner
//! never appends to it directly. `nodeId` is present iff the entry describes
//! a suite-triggered case; standalone case entries omit every suite/plan/
//! parent field.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pvtx_core::Status;
use pvtx_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Index Entry
// ============================================================================

/// Which kind of run an [`IndexEntry`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunKind {
    /// A standalone test-case run.
    TestCase,
    /// A suite-triggered test-case run.
    SuiteNode,
    /// A suite group run.
    Suite,
    /// A plan group run.
    Plan,
}

/// A single `index.jsonl` line.
///
/// # Invariants
/// - For a standalone case run, `node_id`, `suite_id`, `suite_version`,
///   `plan_id`, `plan_version` and `parent_run_id` are all `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    /// Run identifier (case run folder id, or group run folder id).
    pub run_id: String,
    /// Kind of run this entry describes.
    pub run_type: RunKind,
    /// Suite node id, present iff this is a suite-triggered case.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<String>,
    /// Test-case id, present for case runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_id: Option<String>,
    /// Test-case version, present for case runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub test_version: Option<String>,
    /// Suite id, present for suite-scoped runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_id: Option<String>,
    /// Suite version, present for suite-scoped runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_version: Option<String>,
    /// Plan id, present for plan-scoped runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_id: Option<String>,
    /// Plan version, present for plan-scoped runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_version: Option<String>,
    /// Parent group run id, present for nested runs.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub parent_run_id: Option<String>,
    /// Run start time.
    pub start_time: Timestamp,
    /// Run end time.
    pub end_time: Timestamp,
    /// Final run status.
    pub status: Status,
}

impl IndexEntry {
    /// Returns true when every suite/plan/parent field required to be
    /// absent for a standalone case entry actually is absent.
    #[must_use]
    pub const fn is_well_formed_standalone_case(&self) -> bool {
        self.node_id.is_none()
            && self.suite_id.is_none()
            && self.suite_version.is_none()
            && self.plan_id.is_none()
            && self.plan_version.is_none()
            && self.parent_run_id.is_none()
    }
}
