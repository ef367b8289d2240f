// crates/pvtx-runfolder/src/layout.rs
// ============================================================================
// Module: Run Folder Layout
// Description: Directory shapes for case and group run folders.
// Purpose: Give every writer one place that knows where a case folder's
//          artifacts/control subfolders live and where a group folder's
//          children.jsonl sits.
// Dependencies: std::fs
// ============================================================================

//! ## Overview
//! A case run folder holds `manifest.json`, `params.json`, `env.json`,
//! `stdout.log`, `stderr.log`, `result.json`, optional `events.jsonl` and
//! `session.json`, and two subfolders: `artifacts/` (runner-writable) and
//! `control/` (where a script drops `reboot.json`). A group run folder
//! (suite or plan) holds `manifest.json`, `controls.json` (suite only),
//! `environment.json`, `runRequest.json`, `children.jsonl`, optional
//! `events.jsonl`, `result.json` and optional `session.json`. Group folders
//! have no `artifacts/` or `control/` subfolder of their own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Case Folder
// ============================================================================

/// Path of a case run folder under `runs_root`.
#[must_use]
pub fn case_run_dir(runs_root: &Path, run_id: &str) -> PathBuf {
    runs_root.join(run_id)
}

/// Path of a case run folder's `artifacts/` subfolder.
#[must_use]
pub fn case_artifacts_dir(case_dir: &Path) -> PathBuf {
    case_dir.join("artifacts")
}

/// Path of a case run folder's `control/` subfolder.
#[must_use]
pub fn case_control_dir(case_dir: &Path) -> PathBuf {
    case_dir.join("control")
}

/// Creates a case run folder and its `artifacts/` and `control/`
/// subfolders.
///
/// # Errors
///
/// Returns an [`io::Error`] if any directory cannot be created.
pub fn ensure_case_run_dirs(case_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(case_artifacts_dir(case_dir))?;
    std::fs::create_dir_all(case_control_dir(case_dir))?;
    Ok(())
}

// ============================================================================
// SECTION: Group Folder
// ============================================================================

/// Path of a group (suite or plan) run folder under `runs_root`.
#[must_use]
pub fn group_run_dir(runs_root: &Path, group_run_id: &str) -> PathBuf {
    runs_root.join(group_run_id)
}

/// Creates a group run folder. Group folders have no subfolders of their
/// own; each child case or nested group lives in its own top-level run
/// folder under the same `runs_root`.
///
/// # Errors
///
/// Returns an [`io::Error`] if the directory cannot be created.
pub fn ensure_group_run_dir(group_dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(group_dir)
}
