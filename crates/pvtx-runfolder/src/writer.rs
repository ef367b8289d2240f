// crates/pvtx-runfolder/src/writer.rs
// ============================================================================
// Module: Atomic JSON Writers
// Description: Write-to-temp-then-rename helpers for every top-level run
//              folder JSON file.
// Purpose: Guarantee a reader never observes a partially written
//          manifest.json, result.json or session.json: the file either
//          has its old full contents or its new full contents.
// Dependencies: serde, serde_json, std::fs
// ============================================================================

//! ## Overview
//! Every top-level file in a run folder (`manifest.json`, `params.json`,
//! `env.json`, `runRequest.json`, `environment.json`, `controls.json`,
//! `result.json`, `session.json`) is written by serializing to a sibling
//! `.tmp` file and renaming it into place, the same atomic-replace pattern
//! a script uses to publish `control/reboot.json`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

// ============================================================================
// SECTION: Write Error
// ============================================================================

/// Failure writing a run folder artifact.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The value could not be serialized to JSON.
    #[error("failed to serialize {path}: {source}")]
    Serialize {
        /// Path the value was destined for.
        path: String,
        /// Underlying serialization failure.
        #[source]
        source: serde_json::Error,
    },
    /// The temp file or final rename could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path that could not be written.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// SECTION: Atomic Write
// ============================================================================

/// Serializes `value` as pretty JSON and atomically replaces `path` with
/// the result.
///
/// # Errors
///
/// Returns [`WriteError::Serialize`] if `value` cannot be serialized, or
/// [`WriteError::Io`] if the temp file cannot be written or renamed.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), WriteError> {
    let display = path.display().to_string();
    let body = serde_json::to_vec_pretty(value).map_err(|source| WriteError::Serialize { path: display.clone(), source })?;
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, &body).map_err(|source| WriteError::Io { path: display.clone(), source })?;
    fs::rename(&tmp_path, path).map_err(|source| WriteError::Io { path: display, source })
}
