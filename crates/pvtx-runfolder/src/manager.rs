// crates/pvtx-runfolder/src/manager.rs
// ============================================================================
// Module: Run Folder Manager
// Description: Single owner of the runs root: mints ids, creates folders,
//              and serializes every append to the global index log.
// Purpose: Give the engine one object to construct once per process and
//          share, so `index.jsonl` only ever has one writer regardless of
//          how many suites/plans/cases are running concurrently.
// Dependencies: pvtx-runfolder::append, pvtx-runfolder::id, pvtx-runfolder::layout
// ============================================================================

//! ## Overview
//! [`RunFolderManager`] is constructed once per process against a single
//! `runs_root` and shared (typically behind an `Arc`) by every orchestrator
//! and runner task. It owns the one [`AppendLog`] for `index.jsonl`; callers
//! get their own `AppendLog` per group folder for that group's
//! `children.jsonl` and `events.jsonl`, since those are naturally
//! single-writer already (only the group's own orchestrator task appends to
//! them).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use crate::append::AppendError;
use crate::append::AppendLog;
use crate::id::generate_run_id;
use crate::layout;

// ============================================================================
// SECTION: Run Folder Manager
// ============================================================================

/// Owns the runs root and the global `index.jsonl` append log.
pub struct RunFolderManager {
    /// Root directory all run folders live directly under.
    runs_root: PathBuf,
    /// The single global index log.
    index_log: AppendLog,
}

impl RunFolderManager {
    /// Creates a manager rooted at `runs_root`. Does not create the root
    /// directory; callers are expected to have validated it already (see
    /// `pvtx_config::Roots::validate`).
    #[must_use]
    pub fn new(runs_root: impl Into<PathBuf>) -> Self {
        let runs_root = runs_root.into();
        let index_log = AppendLog::new(runs_root.join("index.jsonl"));
        Self { runs_root, index_log }
    }

    /// The runs root this manager is scoped to.
    #[must_use]
    pub fn runs_root(&self) -> &Path {
        &self.runs_root
    }

    /// Mints a fresh, collision-free run id with the given prefix by
    /// probing the filesystem for an existing folder of that name.
    #[must_use]
    pub fn mint_run_id(&self, prefix: &str) -> String {
        generate_run_id(prefix, |candidate| self.runs_root.join(candidate).exists())
    }

    /// Creates a case run folder (with `artifacts/` and `control/`) for
    /// `run_id` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the directories cannot be created.
    pub fn create_case_folder(&self, run_id: &str) -> std::io::Result<PathBuf> {
        let dir = layout::case_run_dir(&self.runs_root, run_id);
        layout::ensure_case_run_dirs(&dir)?;
        Ok(dir)
    }

    /// Creates a group run folder for `run_id` and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an [`std::io::Error`] if the directory cannot be created.
    pub fn create_group_folder(&self, run_id: &str) -> std::io::Result<PathBuf> {
        let dir = layout::group_run_dir(&self.runs_root, run_id);
        layout::ensure_group_run_dir(&dir)?;
        Ok(dir)
    }

    /// Appends one line to the global `index.jsonl`, retrying per
    /// `backoff_ms` on lock contention.
    ///
    /// # Errors
    ///
    /// Returns [`AppendError`] if every retry attempt fails.
    pub fn append_index_line(&self, line: &str, backoff_ms: &[u64]) -> Result<(), AppendError> {
        self.index_log.append_line(line, backoff_ms)
    }
}
