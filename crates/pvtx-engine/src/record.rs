// crates/pvtx-engine/src/record.rs
// ============================================================================
// Module: Outcome Recording
// Description: The single sink every node/suite/plan outcome passes
//              through on its way to `children.jsonl`, `events.jsonl`,
//              the run folder index, and the reporter.
// Purpose: Keep the four places a run outcome must land (two JSONL logs,
//          the shared index, and whatever is observing the run live) in
//          lock step by writing them from one function instead of four
//          call sites that could drift apart.
// Dependencies: pvtx-runfolder, pvtx-contract
// ============================================================================

//! ## Overview
//! [`record_node_outcome`] is called once per node attempt and once per
//! group (suite/plan) completion. It appends the attempt's
//! [`IndexEntry`] to both the group's local `children.jsonl` (when the
//! caller is a suite or plan) and the run folder's shared
//! `index.jsonl`, appends any accompanying [`EventRecord`]s to the
//! group's `events.jsonl`, and finally notifies the
//! [`crate::reporter::Reporter`] — in that order, so a reporter callback
//! can assume the JSONL logs are already durable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pvtx_contract::EventRecord;
use pvtx_contract::IndexEntry;
use pvtx_runfolder::AppendError;
use pvtx_runfolder::AppendLog;
use pvtx_runfolder::RunFolderManager;

use crate::reporter::NodeFinished;
use crate::reporter::Reporter;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Failure appending an outcome to one of the run folder's JSONL logs.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    /// The group's local `children.jsonl` append failed.
    #[error("appending to children.jsonl failed: {0}")]
    Children(#[source] AppendError),
    /// The run folder's shared `index.jsonl` append failed.
    #[error("appending to index.jsonl failed: {0}")]
    Index(#[source] AppendError),
    /// The group's local `events.jsonl` append failed.
    #[error("appending to events.jsonl failed: {0}")]
    Events(#[source] AppendError),
    /// The outcome or an event could not be serialized to JSON.
    #[error("serializing a record failed: {0}")]
    Serialize(#[source] serde_json::Error),
}

// ============================================================================
// SECTION: Recording
// ============================================================================

/// Records one node attempt's outcome: appends `entry` to `children_log`
/// (the calling group's `children.jsonl`) and to the run folder's shared
/// `index.jsonl`, appends `events` to `events_log`, then notifies
/// `reporter`.
///
/// # Errors
///
/// Returns the first [`RecordError`] encountered; the JSONL writes are
/// attempted in the order documented on the module, so a caller that gets
/// an error back knows exactly how far recording got before failing.
pub fn record_node_outcome(manager: &RunFolderManager, children_log: &AppendLog, events_log: &AppendLog, backoff_ms: &[u64], entry: &IndexEntry, events: &[EventRecord], reporter: &dyn Reporter) -> Result<(), RecordError> {
    let line = serde_json::to_string(entry).map_err(RecordError::Serialize)?;
    children_log.append_line(&line, backoff_ms).map_err(RecordError::Children)?;
    manager.append_index_line(&line, backoff_ms).map_err(RecordError::Index)?;

    for event in events {
        let event_line = serde_json::to_string(event).map_err(RecordError::Serialize)?;
        events_log.append_line(&event_line, backoff_ms).map_err(RecordError::Events)?;
        reporter.on_event(event);
    }

    reporter.on_node_finished(NodeFinished { run_id: entry.run_id.clone(), node_id: entry.node_id.clone(), status: entry.status });
    Ok(())
}
