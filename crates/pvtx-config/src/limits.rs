// crates/pvtx-config/src/limits.rs
// ============================================================================
// Module: Engine Limits
// Description: Tunable ceilings and schedules shared by the run-folder
//              manager, the runner and the reboot/resume subsystem.
// Purpose: Keep every retry/backoff/timeout constant in one place instead
//          of scattered literals across crates.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`EngineLimits`] carries the append-retry backoff schedule used by the
//! run-folder manager, the default per-case timeout used when a manifest
//! omits `timeoutSec`, and the resume ceiling the reboot/resume subsystem
//! enforces (a session resumed more than once finalizes as `Error`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Engine Limits
// ============================================================================

/// Tunable ceilings and retry schedules for the engine core.
///
/// # Invariants
/// - `append_retry_backoff_ms` is applied in order; once exhausted the
///   final attempt is made without further delay.
/// - `max_resume_count` of `1` matches the "exactly one reboot per run"
///   invariant: a session is finalized as `Error` once `resumeCount`
///   exceeds this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineLimits {
    /// Backoff schedule, in milliseconds, for retrying a contended append
    /// to `children.jsonl` / `events.jsonl` / `index.jsonl`.
    #[serde(default = "default_append_retry_backoff_ms")]
    pub append_retry_backoff_ms: Vec<u64>,
    /// Per-case timeout used when a manifest omits `timeoutSec`.
    #[serde(default = "default_timeout_sec")]
    pub default_timeout_sec: u64,
    /// Number of resumes a session may absorb before being finalized as
    /// `Error`.
    #[serde(default = "default_max_resume_count")]
    pub max_resume_count: u32,
}

fn default_append_retry_backoff_ms() -> Vec<u64> {
    vec![10, 20, 30]
}

const fn default_timeout_sec() -> u64 {
    300
}

const fn default_max_resume_count() -> u32 {
    1
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            append_retry_backoff_ms: default_append_retry_backoff_ms(),
            default_timeout_sec: default_timeout_sec(),
            max_resume_count: default_max_resume_count(),
        }
    }
}
