// crates/pvtx-contract/src/reboot.rs
// ============================================================================
// Module: Reboot Control File
// Description: The script-writable `control/reboot.json` schema and the
//              engine-facing `RebootInfo` carried into result/session files.
// Purpose: Give the runner one strict parser for the only file a script is
//          allowed to write back to the engine, rejecting unknown keys.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A script that needs the host machine to reboot writes
//! `control/reboot.json` into its run folder before exiting 0. The runner
//! reads it back, validates it against [`RebootControlFile`], and folds it
//! into a [`RebootInfo`] that propagates up through the case result, the
//! group result, and the persisted session.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// The only accepted value for [`RebootControlFile::file_type`].
pub const REBOOT_CONTROL_TYPE: &str = "control.reboot_required";

// ============================================================================
// SECTION: Reboot Delay
// ============================================================================

/// Optional delay-before-reboot detail nested under `reboot` in the control
/// file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RebootDelay {
    /// Seconds to wait before issuing the platform reboot call.
    pub delay_sec: u32,
}

// ============================================================================
// SECTION: Control File
// ============================================================================

/// The `control/reboot.json` file a running script may write before exiting
/// to request a host reboot and a resumed continuation.
///
/// # Invariants
/// - `file_type` must equal [`REBOOT_CONTROL_TYPE`] exactly; any other value
///   is rejected at parse time, not silently accepted.
/// - `next_phase` is one-based and must be at least 1.
/// - `reason` must be non-empty after trimming.
/// - Unknown keys at the root, or inside `reboot`, are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RebootControlFile {
    /// Must equal [`REBOOT_CONTROL_TYPE`].
    #[serde(rename = "type")]
    pub file_type: String,
    /// One-based phase index to resume at after the reboot.
    pub next_phase: u32,
    /// Human-readable reason the script requested a reboot.
    pub reason: String,
    /// Optional delay-before-reboot detail.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub reboot: Option<RebootDelay>,
}

/// Reason a [`RebootControlFile`] failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RebootControlFileError {
    /// `type` was not [`REBOOT_CONTROL_TYPE`].
    #[error("control file has type {found:?}, expected {REBOOT_CONTROL_TYPE:?}")]
    WrongType {
        /// The value actually present.
        found: String,
    },
    /// `nextPhase` was zero.
    #[error("nextPhase must be at least 1")]
    NextPhaseZero,
    /// `reason` was empty or all whitespace.
    #[error("reason must be non-empty")]
    EmptyReason,
}

impl RebootControlFile {
    /// Validates the structural invariants that `deny_unknown_fields` cannot
    /// express: a fixed `type` literal, a one-based `nextPhase`, and a
    /// non-empty `reason`.
    ///
    /// # Errors
    /// Returns [`RebootControlFileError`] on the first violated invariant.
    pub fn validate(&self) -> Result<(), RebootControlFileError> {
        if self.file_type != REBOOT_CONTROL_TYPE {
            return Err(RebootControlFileError::WrongType {
                found: self.file_type.clone(),
            });
        }
        if self.next_phase == 0 {
            return Err(RebootControlFileError::NextPhaseZero);
        }
        if self.reason.trim().is_empty() {
            return Err(RebootControlFileError::EmptyReason);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Engine-Facing Reboot Info
// ============================================================================

/// Reboot detail folded into a case or group result, and into the persisted
/// session, once a [`RebootControlFile`] has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebootInfo {
    /// One-based phase index to resume at.
    pub next_phase: u32,
    /// Reason the reboot was requested.
    pub reason: String,
    /// Seconds waited before the platform reboot call was issued, if any
    /// delay was requested.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub delay_sec: Option<u32>,
}

impl From<RebootControlFile> for RebootInfo {
    fn from(control: RebootControlFile) -> Self {
        Self {
            next_phase: control.next_phase,
            reason: control.reason,
            delay_sec: control.reboot.map(|delay| delay.delay_sec),
        }
    }
}
