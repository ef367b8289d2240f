// crates/pvtx-runner/src/lib.rs
// ============================================================================
// Module: PVT-X Runner
// Description: Case subprocess execution: argv construction, streaming,
//              timeout/abort enforcement, exit-code mapping, reboot
//              detection, and the case run folder's artifact writers.
// Purpose: Give the engine the one collaborator it calls to actually run a
//          test case and get back a result, never touching a shell.
// Dependencies: pvtx-contract, pvtx-core, pvtx-runfolder, libc, tokio
// ============================================================================

//! ## Overview
//! This crate treats the script interpreter as opaque: it knows how to
//! build an argv, launch a process, stream and redact its output, enforce
//! a timeout or an abort signal, map its exit code to a [`pvtx_core::Status`],
//! and detect a reboot control file. Everything about suite/plan sequencing,
//! retries, and input/environment resolution lives upstream in the engine.

pub mod argv;
pub mod artifacts;
pub mod spawn;

pub use argv::build_argv;
pub use artifacts::ResultContext;
pub use artifacts::build_case_result;
pub use artifacts::write_env_snapshot;
pub use artifacts::write_manifest_snapshot;
pub use artifacts::write_params_snapshot;
pub use artifacts::write_result;
pub use spawn::CaseLaunchSpec;
pub use spawn::CaseOutcome;
pub use spawn::RunnerError;
pub use spawn::execute_case;
