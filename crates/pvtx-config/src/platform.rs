// crates/pvtx-config/src/platform.rs
// ============================================================================
// Module: Platform Adapter
// Description: Trait abstracting the OS-level autostart/reboot mechanism
//              out of the reboot/resume subsystem.
// Purpose: Let the orchestrators be tested deterministically without ever
//          touching a real scheduled task or issuing a real reboot.
// Dependencies: std::sync
// ============================================================================

//! ## Overview
//! The reboot/resume subsystem never calls into the OS directly. It holds a
//! `dyn PlatformAdapter` and calls [`PlatformAdapter::schedule_resume`] then
//! [`PlatformAdapter::reboot`]. Production wiring supplies a real adapter;
//! tests supply [`RecordingPlatformAdapter`], which records every call
//! instead of touching the host machine.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

// ============================================================================
// SECTION: Resume Command
// ============================================================================

/// The one-shot autostart invocation the platform adapter must schedule
/// before the engine reboots the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeCommand {
    /// Run id of the top-level orchestrator that requested the reboot.
    pub run_id: String,
    /// Opaque resume token the resumed process must present.
    pub resume_token: String,
    /// Runs root to pass back to the resumed CLI invocation.
    pub runs_root: String,
    /// Seconds to wait before issuing the reboot, per the reboot control
    /// file's optional `delaySec`.
    pub delay_sec: u32,
}

// ============================================================================
// SECTION: Platform Error
// ============================================================================

/// Failure reaching the OS-level scheduling or reboot mechanism.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("platform adapter failure: {0}")]
pub struct PlatformError(pub String);

// ============================================================================
// SECTION: Platform Adapter Trait
// ============================================================================

/// Abstracts the OS-level autostart registration and reboot call.
///
/// # Invariants
/// - `schedule_resume` must succeed before `reboot` is ever called; the
///   reboot/resume subsystem never reboots without a registered resume
///   path.
pub trait PlatformAdapter: Send + Sync {
    /// Registers a one-shot scheduled task that re-invokes the CLI with
    /// `--resume` once the machine comes back up.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the scheduling mechanism is unavailable
    /// or rejects the request.
    fn schedule_resume(&self, command: &ResumeCommand) -> Result<(), PlatformError>;

    /// Issues the OS-level reboot.
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError`] if the reboot call is rejected.
    fn reboot(&self) -> Result<(), PlatformError>;
}

// ============================================================================
// SECTION: Recording Adapter
// ============================================================================

/// A deterministic, in-memory [`PlatformAdapter`] for tests. Never touches
/// the host machine; records every call for later assertion.
#[derive(Debug, Default)]
pub struct RecordingPlatformAdapter {
    scheduled: Mutex<Vec<ResumeCommand>>,
    reboot_count: Mutex<u32>,
}

impl RecordingPlatformAdapter {
    /// Builds an adapter with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every [`ResumeCommand`] passed to `schedule_resume`, in
    /// call order.
    #[must_use]
    pub fn scheduled_commands(&self) -> Vec<ResumeCommand> {
        self.scheduled.lock().map_or_else(|_| Vec::new(), |guard| guard.clone())
    }

    /// Returns how many times `reboot` was called.
    #[must_use]
    pub fn reboot_count(&self) -> u32 {
        self.reboot_count.lock().map_or(0, |guard| *guard)
    }
}

impl PlatformAdapter for RecordingPlatformAdapter {
    fn schedule_resume(&self, command: &ResumeCommand) -> Result<(), PlatformError> {
        if let Ok(mut scheduled) = self.scheduled.lock() {
            scheduled.push(command.clone());
        }
        Ok(())
    }

    fn reboot(&self) -> Result<(), PlatformError> {
        if let Ok(mut count) = self.reboot_count.lock() {
            *count += 1;
        }
        Ok(())
    }
}
