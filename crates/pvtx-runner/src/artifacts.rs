// crates/pvtx-runner/src/artifacts.rs
// ============================================================================
// Module: Case Artifact Writers
// Description: Writes the pre-execution (`manifest.json`, `params.json`,
//              `env.json`) and post-execution (`result.json`) top-level
//              files inside a case run folder.
// Purpose: Keep the exact on-disk shape of a case run folder in one place,
//          distinct from process supervision in `spawn`.
// Dependencies: pvtx-contract, pvtx-core, pvtx-runfolder, serde_json
// ============================================================================

//! ## Overview
//! `manifest.json`, `params.json` and `env.json` are snapshots written
//! before the subprocess starts, so a run folder is self-describing even if
//! the process never completes. `result.json` is written once, after
//! [`crate::spawn::execute_case`] returns.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use pvtx_contract::CaseError;
use pvtx_contract::RebootInfo;
use pvtx_contract::RunnerMetadata;
use pvtx_contract::TestCaseResult;
use pvtx_contract::result::RESULT_SCHEMA_VERSION;
use pvtx_core::Secret;
use pvtx_core::Status;
use pvtx_core::TestCaseManifest;
use pvtx_core::Timestamp;
use pvtx_runfolder::WriteError;
use pvtx_runfolder::write_json_atomic;
use serde_json::Value;

// ============================================================================
// SECTION: Pre-Execution Snapshots
// ============================================================================

/// Writes `manifest.json`, a copy of the parsed test-case manifest, into
/// `case_dir`.
///
/// # Errors
///
/// Returns [`WriteError`] if the file cannot be written.
pub fn write_manifest_snapshot(case_dir: &Path, manifest: &TestCaseManifest) -> Result<(), WriteError> {
    write_json_atomic(&case_dir.join("manifest.json"), manifest)
}

/// Writes `params.json`, the resolved effective inputs (redacted), into
/// `case_dir`.
///
/// # Errors
///
/// Returns [`WriteError`] if the file cannot be written.
pub fn write_params_snapshot(case_dir: &Path, effective_inputs: &BTreeMap<String, Secret<Value>>) -> Result<(), WriteError> {
    write_json_atomic(&case_dir.join("params.json"), effective_inputs)
}

/// Writes `env.json`, the resolved effective environment (redacted), into
/// `case_dir`.
///
/// # Errors
///
/// Returns [`WriteError`] if the file cannot be written.
pub fn write_env_snapshot(case_dir: &Path, effective_environment: &BTreeMap<String, Secret<String>>) -> Result<(), WriteError> {
    write_json_atomic(&case_dir.join("env.json"), effective_environment)
}

// ============================================================================
// SECTION: Result Builder
// ============================================================================

/// Identity context a case result is attached to: the case itself, plus
/// optional suite/plan/node ancestry.
#[derive(Debug, Clone, Default)]
pub struct ResultContext {
    /// Suite node id, present iff this case ran inside a suite.
    pub node_id: Option<String>,
    /// Suite id, present iff suite- or plan-triggered.
    pub suite_id: Option<String>,
    /// Suite version, present iff suite- or plan-triggered.
    pub suite_version: Option<String>,
    /// Plan id, present iff plan-triggered.
    pub plan_id: Option<String>,
    /// Plan version, present iff plan-triggered.
    pub plan_version: Option<String>,
}

/// Builds the [`TestCaseResult`] for a finished case run.
#[must_use]
#[allow(clippy::too_many_arguments, reason = "mirrors the fixed result.json shape; splitting it would just move the same fields into a builder")]
pub fn build_case_result(
    manifest: &TestCaseManifest,
    context: &ResultContext,
    status: Status,
    start_time: Timestamp,
    end_time: Timestamp,
    exit_code: Option<i32>,
    effective_inputs: BTreeMap<String, Secret<Value>>,
    error: Option<CaseError>,
    runner: Option<RunnerMetadata>,
    reboot: Option<RebootInfo>,
) -> TestCaseResult {
    TestCaseResult {
        schema_version: RESULT_SCHEMA_VERSION,
        run_type: "TestCase".to_string(),
        node_id: context.node_id.clone(),
        test_id: manifest.id.clone(),
        test_version: manifest.version.clone(),
        suite_id: context.suite_id.clone(),
        suite_version: context.suite_version.clone(),
        plan_id: context.plan_id.clone(),
        plan_version: context.plan_version.clone(),
        status,
        start_time,
        end_time,
        metrics: None,
        message: error.as_ref().map(|err| err.message.clone()),
        exit_code,
        effective_inputs,
        error,
        runner,
        reboot,
    }
}

/// Writes `result.json` into `case_dir`.
///
/// # Errors
///
/// Returns [`WriteError`] if the file cannot be written.
pub fn write_result(case_dir: &Path, result: &TestCaseResult) -> Result<(), WriteError> {
    write_json_atomic(&case_dir.join("result.json"), result)
}
