// crates/pvtx-engine/src/snapshot.rs
// ============================================================================
// Module: Manifest Snapshot
// Description: Builds and writes a case run folder's `manifest.json`, the
//              full pre-execution snapshot of what was resolved and how.
// Purpose: Make a case run folder self-describing: everything needed to
//          explain why a script ran with the arguments and environment it
//          got, captured before the subprocess starts.
// Dependencies: pvtx-core, pvtx-runfolder, serde, serde_json
// ============================================================================

//! ## Overview
//! [`write_manifest_snapshot`] replaces
//! [`pvtx_runner::write_manifest_snapshot`]'s raw manifest copy with the
//! richer shape a case run folder's `manifest.json` carries: the source
//! manifest as discovered, the reference string and identity it resolved
//! from, the effective environment and inputs actually used, the declared
//! input templates, the resolution timestamp, and this engine's own
//! version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use pvtx_core::Identity;
use pvtx_core::Secret;
use pvtx_core::TestCaseManifest;
use pvtx_core::Timestamp;
use pvtx_core::manifest::ParamDef;
use pvtx_runfolder::WriteError;
use pvtx_runfolder::write_json_atomic;
use serde::Serialize;
use serde_json::Value;

/// This crate's own version, stamped into every manifest snapshot so a
/// run folder records which engine build produced it.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Full pre-execution snapshot written as a case run folder's
/// `manifest.json`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestSnapshot<'a> {
    /// The case manifest exactly as discovery parsed it.
    pub source_manifest: &'a TestCaseManifest,
    /// The reference string this case was resolved from: a suite node's
    /// `ref`, or the `RunTarget::TestCase` identity/path string.
    pub resolved_ref: &'a str,
    /// The parsed `id@version` identity the reference resolved to.
    pub resolved_identity: String,
    /// The environment this case actually ran with, redacted.
    pub effective_environment: &'a BTreeMap<String, Secret<String>>,
    /// The inputs this case actually ran with, redacted.
    pub effective_inputs: &'a BTreeMap<String, Secret<Value>>,
    /// The manifest's declared input parameter templates, so a reader can
    /// compare what was declared against what was effective without
    /// re-opening the source case.
    pub input_templates: &'a [ParamDef],
    /// When this snapshot was resolved, not when the script finished.
    pub resolved_at: Timestamp,
    /// This engine build's own version.
    pub engine_version: &'a str,
}

/// Writes `manifest.json` into `case_dir`.
///
/// # Errors
///
/// Returns [`WriteError`] if the file cannot be written.
pub fn write_manifest_snapshot(case_dir: &Path, manifest: &TestCaseManifest, resolved_ref: &str, resolved_identity: &Identity, effective_environment: &BTreeMap<String, Secret<String>>, effective_inputs: &BTreeMap<String, Secret<Value>>, resolved_at: Timestamp) -> Result<(), WriteError> {
    let snapshot = ManifestSnapshot {
        source_manifest: manifest,
        resolved_ref,
        resolved_identity: resolved_identity.to_string(),
        effective_environment,
        effective_inputs,
        input_templates: &manifest.parameters,
        resolved_at,
        engine_version: ENGINE_VERSION,
    };
    write_json_atomic(&case_dir.join("manifest.json"), &snapshot)
}
