// crates/pvtx-runfolder/src/lib.rs
// ============================================================================
// Module: PVT-X Run Folder
// Description: Exclusive writer for case/group run folders and the global
//              append-only index log.
// Purpose: Give the engine and runner one crate that owns every on-disk
//          run artifact: folder layout, id minting, atomic JSON writes,
//          and append-with-retry for the JSONL logs.
// Dependencies: pvtx-contract, pvtx-core, fs2, rand, serde, serde_json,
//               thiserror
// ============================================================================

//! ## Overview
//! This crate is the only place that touches the runs root on disk. It
//! mints run ids ([`id`]), lays out case and group folders ([`layout`]),
//! writes atomic JSON artifacts ([`writer`]), appends to JSONL logs under
//! a single-writer guarantee ([`append`]), reconstructs a group's progress
//! from its `children.jsonl` on resume ([`children`]), and ties all of it
//! together behind one process-wide object ([`manager`]).

pub mod append;
pub mod children;
pub mod id;
pub mod layout;
pub mod manager;
pub mod writer;

pub use append::AppendError;
pub use append::AppendLog;
pub use children::ChildrenReadError;
pub use children::reconstruct_children;
pub use children::reconstruct_children_ordered;
pub use id::CASE_RUN_PREFIX;
pub use id::PLAN_RUN_PREFIX;
pub use id::SUITE_RUN_PREFIX;
pub use id::generate_run_id;
pub use manager::RunFolderManager;
pub use writer::WriteError;
pub use writer::write_json_atomic;
