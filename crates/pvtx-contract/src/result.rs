// crates/pvtx-contract/src/result.rs
// ============================================================================
// Module: Result Artifacts
// Description: `result.json` shapes for case run folders and group (suite/
//              plan) run folders.
// Purpose: Give the runner and orchestrators one canonical result shape so
//          `result.json` stays bit-exact across both owners.
// Dependencies: pvtx-core, crate::reboot, serde, serde_json
// ============================================================================

//! ## Overview
//! [`TestCaseResult`] is written by the case runner; [`GroupResult`] is
//! written by the suite/plan orchestrator. Both carry a `schema_version` so
//! future-format readers can detect the shape they are parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use pvtx_core::Secret;
use pvtx_core::Status;
use pvtx_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::reboot::RebootInfo;

// ============================================================================
// SECTION: Schema Version
// ============================================================================

/// Current `result.json` schema version for both case and group results.
pub const RESULT_SCHEMA_VERSION: u32 = 1;

// ============================================================================
// SECTION: Error Kind
// ============================================================================

/// Error classification for a failed or errored case run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// The runner killed the process tree after `timeoutSec` elapsed.
    Timeout,
    /// The run was killed by a user-issued cancellation.
    Aborted,
    /// The script exited with a non-{0,1} code.
    ScriptError,
    /// The runner itself failed (process start failure, internal
    /// exception).
    RunnerError,
}

/// Structured error detail attached to a non-passed case result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseError {
    /// Error classification.
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Human-readable detail.
    pub message: String,
}

// ============================================================================
// SECTION: Runner Metadata
// ============================================================================

/// Runtime environment metadata captured alongside a case result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerMetadata {
    /// OS version string.
    pub os_version: String,
    /// Engine/runner build version.
    pub runner_version: String,
    /// Script-runtime (interpreter) version, if known.
    #[serde(default)]
    pub script_runtime_version: Option<String>,
    /// Whether the process ran elevated.
    pub elevated: bool,
}

// ============================================================================
// SECTION: Test Case Result
// ============================================================================

/// `result.json` written by the case runner into `{RunId}/`.
///
/// # Invariants
/// - `reboot` is present iff `status == RebootRequired`.
/// - Every value in `effective_inputs` whose source was flagged secret is
///   already a `Secret` wrapper and serializes as `"***"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    /// Schema version, currently [`RESULT_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Always `"TestCase"`.
    pub run_type: String,
    /// Suite node id, present iff suite-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<String>,
    /// Test-case id.
    pub test_id: String,
    /// Test-case version.
    pub test_version: String,
    /// Suite id, present iff suite- or plan-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_id: Option<String>,
    /// Suite version, present iff suite- or plan-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_version: Option<String>,
    /// Plan id, present iff plan-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_id: Option<String>,
    /// Plan version, present iff plan-triggered.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_version: Option<String>,
    /// Final status.
    pub status: Status,
    /// Run start time.
    pub start_time: Timestamp,
    /// Run end time.
    pub end_time: Timestamp,
    /// Free-form numeric metrics emitted by the script, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metrics: Option<BTreeMap<String, f64>>,
    /// Human-readable status message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Process exit code, absent when the process never started.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exit_code: Option<i32>,
    /// Effective inputs, redacted.
    pub effective_inputs: BTreeMap<String, Secret<Value>>,
    /// Structured error detail, present for non-passed/non-reboot results.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<CaseError>,
    /// Runner metadata.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub runner: Option<RunnerMetadata>,
    /// Reboot request detail, present iff `status == RebootRequired`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reboot: Option<RebootInfo>,
}

impl TestCaseResult {
    /// Returns true when `reboot` presence matches `status` per the
    /// invariant (`reboot` set iff `status == RebootRequired`).
    #[must_use]
    pub const fn reboot_presence_is_consistent(&self) -> bool {
        matches!(self.status, Status::RebootRequired) == self.reboot.is_some()
    }
}

// ============================================================================
// SECTION: Group Result
// ============================================================================

/// Which kind of group a [`GroupResult`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupRunType {
    /// A suite group run.
    Suite,
    /// A plan group run.
    Plan,
}

/// Terminal status counts across a group's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    /// Total child runs recorded.
    pub total: u32,
    /// Children that finished `Passed`.
    pub passed: u32,
    /// Children that finished `Failed`.
    pub failed: u32,
    /// Children that finished `Error`.
    pub error: u32,
    /// Children that finished `Timeout`.
    pub timeout: u32,
    /// Children that finished `Aborted`.
    pub aborted: u32,
}

impl Counts {
    /// Folds one more child status into the running counts.
    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Error => self.error += 1,
            Status::Timeout => self.timeout += 1,
            Status::Aborted => self.aborted += 1,
            Status::RebootRequired => {}
        }
    }
}

/// `result.json` written by the suite/plan orchestrator into
/// `{GroupRunId}/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    /// Schema version, currently [`RESULT_SCHEMA_VERSION`].
    pub schema_version: u32,
    /// Whether this is a suite or plan group.
    pub run_type: GroupRunType,
    /// Suite id (always present for suite groups; present for plan groups
    /// only when summarizing a specific suite child is not applicable).
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_id: Option<String>,
    /// Suite version.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub suite_version: Option<String>,
    /// Plan id, present for plan groups.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_id: Option<String>,
    /// Plan version, present for plan groups.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub plan_version: Option<String>,
    /// Final aggregated status.
    pub status: Status,
    /// Run start time.
    pub start_time: Timestamp,
    /// Run end time.
    pub end_time: Timestamp,
    /// Status counts across children.
    pub counts: Counts,
    /// Child run ids, in completion order.
    pub child_run_ids: Vec<String>,
    /// Human-readable status message.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    /// Reboot request detail, present iff `status == RebootRequired`.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reboot: Option<RebootInfo>,
}
