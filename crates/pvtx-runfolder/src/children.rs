// crates/pvtx-runfolder/src/children.rs
// ============================================================================
// Module: Children Log Reconstruction
// Description: Reads a group's `children.jsonl` back into latest-per-child
//              progress, for resume.
// Purpose: Let the orchestrator rebuild "what has this suite/plan already
//          run" from the append log alone, without a separate index.
// Dependencies: pvtx-contract, serde_json, std::fs
// ============================================================================

//! ## Overview
//! `children.jsonl` is append-only: a child run id may appear more than
//! once (e.g. once when control asks for a reboot, again once it actually
//! finishes). [`reconstruct_children`] keeps only the latest line per
//! `run_id` and drops any child whose latest status is still
//! `RebootRequired`, since that child has not actually finished.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use pvtx_contract::IndexEntry;
use pvtx_core::Status;

// ============================================================================
// SECTION: Reconstruction
// ============================================================================

/// Failure reconstructing a `children.jsonl` log.
#[derive(Debug, thiserror::Error)]
pub enum ChildrenReadError {
    /// The file could not be read. A missing file is not an error; it is
    /// treated as zero children by the caller before this function runs.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A line was not valid JSON or did not match [`IndexEntry`].
    #[error("invalid children.jsonl line {line_number} in {path}: {source}")]
    Parse {
        /// Path of the offending file.
        path: String,
        /// One-based line number of the offending entry.
        line_number: usize,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Reads `path` and returns the latest entry per child `run_id`, excluding
/// any child whose latest recorded status is still [`Status::RebootRequired`].
///
/// # Errors
///
/// Returns [`ChildrenReadError::Io`] or [`ChildrenReadError::Parse`] on a
/// malformed log.
pub fn reconstruct_children(path: &Path) -> Result<BTreeMap<String, IndexEntry>, ChildrenReadError> {
    let content = fs::read_to_string(path).map_err(|source| ChildrenReadError::Io { path: path.display().to_string(), source })?;
    let mut latest: BTreeMap<String, IndexEntry> = BTreeMap::new();
    for (offset, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: IndexEntry = serde_json::from_str(line)
            .map_err(|source| ChildrenReadError::Parse { path: path.display().to_string(), line_number: offset + 1, source })?;
        latest.insert(entry.run_id.clone(), entry);
    }
    latest.retain(|_run_id, entry| entry.status != Status::RebootRequired);
    Ok(latest)
}

/// Like [`reconstruct_children`], but returns entries in first-seen order
/// instead of keyed by `run_id`. A child's `run_id` is not chronologically
/// sortable (it carries a random tail), so a caller that needs to resume a
/// node-index walk in original append order must use this instead of
/// iterating a `BTreeMap`.
///
/// # Errors
///
/// Returns [`ChildrenReadError::Io`] or [`ChildrenReadError::Parse`] on a
/// malformed log.
pub fn reconstruct_children_ordered(path: &Path) -> Result<Vec<IndexEntry>, ChildrenReadError> {
    let content = fs::read_to_string(path).map_err(|source| ChildrenReadError::Io { path: path.display().to_string(), source })?;
    let mut order: Vec<String> = Vec::new();
    let mut latest: BTreeMap<String, IndexEntry> = BTreeMap::new();
    for (offset, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry: IndexEntry = serde_json::from_str(line)
            .map_err(|source| ChildrenReadError::Parse { path: path.display().to_string(), line_number: offset + 1, source })?;
        if !latest.contains_key(&entry.run_id) {
            order.push(entry.run_id.clone());
        }
        latest.insert(entry.run_id.clone(), entry);
    }
    Ok(order.into_iter().filter_map(|run_id| latest.remove(&run_id)).filter(|entry| entry.status != Status::RebootRequired).collect())
}
