// crates/pvtx-cli/src/platform.rs
// ============================================================================
// Module: Local Platform Adapter
// Description: Concrete `PlatformAdapter` wiring the reboot/resume subsystem
//              to an OS-level scheduled task and reboot call.
// Purpose: Give a real engine deployment something other than the test
//          harness's `RecordingPlatformAdapter` to run against.
// Dependencies: pvtx-config, std::process
// ============================================================================

//! ## Overview
//! [`LocalPlatformAdapter`] shells out to the host's own task scheduler and
//! reboot command rather than linking a platform-specific crate, matching
//! the engine's own posture of treating the case script as an opaque
//! subprocess. The scheduled task's action re-invokes this same CLI binary
//! (`std::env::current_exe`) with `--resume --run-id <id> --token <token>
//! --runs-root <path>`, per the autostart contract in the reboot/resume
//! subsystem.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::process::Command;

use pvtx_config::PlatformAdapter;
use pvtx_config::PlatformError;
use pvtx_config::ResumeCommand;

/// Name given to the one-shot scheduled task registered before a reboot.
const TASK_NAME_PREFIX: &str = "PvtxResume";

// ============================================================================
// SECTION: Local Platform Adapter
// ============================================================================

/// A [`PlatformAdapter`] that schedules resume via the host's task scheduler
/// and reboots via the host's own shutdown command.
///
/// Windows is the reference target (`schtasks`/`shutdown`, matching the
/// `PowerShell\Modules` module-root convention elsewhere in the engine);
/// any other platform with equivalent command-line tools works the same
/// way since this adapter never links a platform-specific crate.
#[derive(Debug, Default)]
pub struct LocalPlatformAdapter;

impl LocalPlatformAdapter {
    /// Builds a new adapter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns this process's own executable path, quoted for inclusion in
    /// a scheduled task's action string.
    fn self_exe() -> Result<String, PlatformError> {
        let path = std::env::current_exe().map_err(|err| PlatformError(format!("cannot resolve current executable: {err}")))?;
        Ok(path.display().to_string())
    }
}

impl PlatformAdapter for LocalPlatformAdapter {
    fn schedule_resume(&self, command: &ResumeCommand) -> Result<(), PlatformError> {
        let exe = Self::self_exe()?;
        let task_name = format!("{TASK_NAME_PREFIX}_{}", command.run_id);
        let resume_args = format!("--resume --run-id {} --token {} --runs-root {}", command.run_id, command.resume_token, command.runs_root);
        let action = format!("cmd /c timeout /t {} /nobreak & \"{exe}\" {resume_args}", command.delay_sec);
        let status = Command::new("schtasks")
            .args(["/create", "/tn", &task_name, "/tr", &action, "/sc", "onstart", "/ru", "SYSTEM", "/f"])
            .status()
            .map_err(|err| PlatformError(format!("failed to invoke schtasks: {err}")))?;
        if !status.success() {
            return Err(PlatformError(format!("schtasks exited with {status}")));
        }
        Ok(())
    }

    fn reboot(&self) -> Result<(), PlatformError> {
        let status = Command::new("shutdown")
            .args(["/r", "/t", "0"])
            .status()
            .map_err(|err| PlatformError(format!("failed to invoke shutdown: {err}")))?;
        if !status.success() {
            return Err(PlatformError(format!("shutdown exited with {status}")));
        }
        Ok(())
    }
}
