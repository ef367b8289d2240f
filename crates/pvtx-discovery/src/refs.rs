// crates/pvtx-discovery/src/refs.rs
// ============================================================================
// Module: Ref Resolver
// Description: Resolves a suite node's `ref` to a test-case manifest path
//              under the cases root, with canonical-path containment
//              checks.
// Purpose: Stop a suite manifest from pointing outside the cases root via
//          `..` segments or a symlink/junction escape.
// Dependencies: pvtx-core, std::fs
// ============================================================================

//! ## Overview
//! A suite node's `ref` is always relative to the cases root. Resolution
//! canonicalizes both the root and the candidate folder (following
//! symlinks/junctions) and then requires the candidate to be a path prefix
//! of the root — this is what stops `ref: "../../etc"` or a symlink planted
//! inside the cases root from escaping it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pvtx_core::EntityKind;
use pvtx_core::RefInvalidReason;

// ============================================================================
// SECTION: Ref Resolution Error
// ============================================================================

/// A suite node `ref` failed to resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("suite test-case ref invalid ({reason:?}): {case_ref}")]
pub struct RefResolveError {
    /// The `ref` string as declared in the suite manifest.
    pub case_ref: String,
    /// Why resolution failed.
    pub reason: RefInvalidReason,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves a suite node's `ref` to its `test.manifest.json` path under
/// `cases_root`.
///
/// # Errors
///
/// Returns [`RefResolveError`] with [`RefInvalidReason::NotFound`] when the
/// referenced folder does not exist, [`RefInvalidReason::OutOfRoot`] when it
/// canonicalizes outside `cases_root`, or
/// [`RefInvalidReason::MissingManifest`] when the folder exists but lacks a
/// case manifest.
pub fn resolve_case_ref(cases_root: &Path, case_ref: &str) -> Result<PathBuf, RefResolveError> {
    let invalid = |reason| RefResolveError {
        case_ref: case_ref.to_string(),
        reason,
    };

    let canonical_root = fs::canonicalize(cases_root).map_err(|_unused| invalid(RefInvalidReason::NotFound))?;
    let candidate = cases_root.join(case_ref);
    let canonical_candidate = fs::canonicalize(&candidate).map_err(|_unused| invalid(RefInvalidReason::NotFound))?;

    if !canonical_candidate.starts_with(&canonical_root) {
        return Err(invalid(RefInvalidReason::OutOfRoot));
    }

    let manifest_path = canonical_candidate.join(EntityKind::TestCase.manifest_file_name());
    if !manifest_path.is_file() {
        return Err(invalid(RefInvalidReason::MissingManifest));
    }

    Ok(manifest_path)
}
