// crates/pvtx-discovery/src/lib.rs
// ============================================================================
// Module: PVT-X Discovery
// Description: Walks the resolved cases/suites/plans roots, builds the
//              identity index, and resolves suite-node refs.
// Purpose: Give the engine one read-only, idempotent view of every
//          discoverable manifest before any run is dispatched.
// Dependencies: pvtx-core
// ============================================================================

//! ## Overview
//! Discovery has two halves: [`DiscoveryIndex`] answers "what identities
//! exist", walking the three roots once per run and failing fast on any
//! cross-kind identity collision; [`resolve_case_ref`] answers "does this
//! suite node's `ref` point at a real case folder inside the cases root".
//! Neither half mutates the filesystem.

pub mod index;
pub mod refs;
pub mod walk;

pub use index::CaseEntry;
pub use index::DiscoveryIndex;
pub use index::PlanEntry;
pub use index::SuiteEntry;
pub use refs::resolve_case_ref;
pub use refs::RefResolveError;
pub use walk::find_manifest_paths;
pub use walk::walk_manifests;
