// crates/pvtx-contract/src/lib.rs
// ============================================================================
// Module: PVT-X Contract
// Description: Wire shapes for the index log, result files, event records,
//              session persistence, and the control-file reboot schema.
// Purpose: Give the CLI, UI and engine one shared, serde-derived contract
//          for every JSON artifact the engine writes to disk.
// Dependencies: pvtx-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every type here round-trips bit-exact against the filesystem layout in
//! the engine specification: `index.jsonl` entries, case/group `result.json`
//! files, `events.jsonl` records, `session.json`, and the script-writable
//! `control/reboot.json` file.

pub mod events;
pub mod index;
pub mod reboot;
pub mod result;
pub mod session;

pub use events::EventRecord;
pub use events::EventSeverity;
pub use index::IndexEntry;
pub use reboot::RebootControlFile;
pub use reboot::RebootInfo;
pub use result::CaseError;
pub use result::Counts;
pub use result::ErrorKind;
pub use result::GroupResult;
pub use result::GroupRunType;
pub use result::RunnerMetadata;
pub use result::TestCaseResult;
pub use session::EntityResumeState;
pub use session::SessionFile;
