// crates/pvtx-engine/src/resume.rs
// ============================================================================
// Module: Reboot/Resume Subsystem
// Description: Persists a session across a script-requested reboot,
//              schedules the resume via an injectable platform adapter,
//              and enforces the engine's resume-count ceiling.
// Purpose: Give the orchestrator one place to turn a
//          `Status::RebootRequired` outcome into a durable session file
//          plus a scheduled autostart, and one place to reconstruct that
//          session on the next process start.
// Dependencies: pvtx-core, pvtx-config, pvtx-contract, pvtx-runfolder
// ============================================================================

//! ## Overview
//! A session is written once a node or case reports
//! [`pvtx_core::Status::RebootRequired`] and the platform has been asked
//! to resume the engine. [`SessionFile::advance_resume`] increments the
//! resume counter; once that counter exceeds
//! [`pvtx_config::EngineLimits::max_resume_count`], the session is
//! finalized with a [`CODE_RESUME_COUNT_EXCEEDED`] event instead of being
//! rescheduled again, so a script stuck in a reboot loop cannot wedge the
//! machine forever.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use pvtx_config::EngineLimits;
use pvtx_config::PlatformAdapter;
use pvtx_config::PlatformError;
use pvtx_config::Roots;
use pvtx_contract::EventRecord;
use pvtx_contract::EventSeverity;
use pvtx_contract::SessionFile;
use pvtx_contract::events::CODE_RESUME_COUNT_EXCEEDED;
use pvtx_contract::session::CaseResumeContext;
use pvtx_contract::session::EntityResumeState;
use pvtx_contract::session::RootsSnapshot;
use pvtx_contract::session::SessionState;
use pvtx_runfolder::write_json_atomic;

/// Default delay before the platform reboot call when the reboot control
/// file did not specify `reboot.delaySec`.
pub const DEFAULT_REBOOT_DELAY_SEC: u32 = 10;

// ============================================================================
// SECTION: Error
// ============================================================================

/// Failure persisting, scheduling, or reconstructing a resume session.
#[derive(Debug, thiserror::Error)]
pub enum ResumeError {
    /// The session file could not be written to disk.
    #[error("writing session.json failed: {0}")]
    Write(#[source] pvtx_runfolder::WriteError),
    /// The session file could not be read back from disk.
    #[error("reading session.json failed: {0}")]
    Read(#[source] std::io::Error),
    /// The session file's contents did not parse.
    #[error("parsing session.json failed: {0}")]
    Parse(#[source] serde_json::Error),
    /// The platform adapter could not schedule the resume.
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

// ============================================================================
// SECTION: Roots Snapshot
// ============================================================================

/// Builds a [`RootsSnapshot`] from the engine's resolved [`Roots`], so a
/// resumed process can reconstruct its filesystem layout without
/// re-reading `pvtx.toml`.
#[must_use]
pub fn snapshot_roots(roots: &Roots) -> RootsSnapshot {
    RootsSnapshot {
        cases_root: roots.cases_root.clone(),
        suites_root: roots.suites_root.clone(),
        plans_root: roots.plans_root.clone(),
        assets_root: roots.assets_root.clone(),
        runs_root: roots.runs_root.clone(),
    }
}

// ============================================================================
// SECTION: Persist and Schedule
// ============================================================================

/// Writes `session` to `{runs_root}/{run_id}/session.json` and asks
/// `platform` to schedule the resume.
///
/// # Errors
///
/// Returns [`ResumeError::Write`] when the session file cannot be written
/// and [`ResumeError::Platform`] when the adapter refuses the schedule
/// request; the session file is written first, so a platform failure
/// still leaves a durable record an operator can resume manually.
pub fn persist_and_schedule(runs_root: &Path, session: &SessionFile, delay_sec: u32, platform: &dyn PlatformAdapter) -> Result<(), ResumeError> {
    let session_path = session_file_path(runs_root, &session.run_id);
    write_json_atomic(&session_path, session).map_err(ResumeError::Write)?;

    let command = pvtx_config::ResumeCommand { run_id: session.run_id.clone(), resume_token: session.resume_token.clone(), runs_root: runs_root.display().to_string(), delay_sec };
    platform.schedule_resume(&command)?;
    Ok(())
}

/// Everything a suspended orchestrator level needs to capture before it
/// persists a session and asks the platform to reboot.
pub struct SuspendRequest<'a> {
    /// Run id of the orchestrator level that is suspending.
    pub run_id: &'a str,
    /// Which orchestrator level is suspending.
    pub entity_type: EntityResumeState,
    /// Phase to resume at, from the reboot control file's `nextPhase`.
    pub next_phase: u32,
    /// Index of the node (suite) or suite entry (plan) suspended at.
    pub current_node_index: Option<usize>,
    /// Run id of the in-flight child at suspension time.
    pub current_child_run_id: Option<String>,
    /// Repeat-iteration count, meaningful for suite sessions only.
    pub current_iteration: Option<u32>,
    /// Resolved context of the suspended case leaf, if any.
    pub case_resume: Option<CaseResumeContext>,
    /// `id@version` identity of the suite or plan suspending, `None` for
    /// a case session.
    pub target_ref: Option<&'a str>,
    /// Seconds to wait before the platform issues the reboot, from the
    /// reboot control file's optional `delaySec`.
    pub delay_sec: Option<u32>,
    /// The resume count already spent against this run id before this
    /// suspend, carried forward from the session [`crate::suite::EngineContext`]
    /// was built with. A fresh run (never resumed) passes `0`; a run that
    /// reboots again after already resuming once must carry that count
    /// forward rather than restart it at `0`, or the ceiling in
    /// [`advance_resume`] never trips.
    pub resume_count: u32,
}

/// Builds a [`SessionFile`] from `request`, persists it, schedules the
/// resume via `platform`, and issues the OS-level reboot.
///
/// # Errors
///
/// Returns [`ResumeError`] when the session cannot be written or the
/// platform adapter refuses the schedule or reboot call. On success the
/// caller should return its own terminal `RebootRequired` status without
/// writing a `result.json`: the specification leaves the group run
/// unfinished until the resumed attempt completes it.
pub fn suspend_for_reboot(roots: &Roots, platform: &dyn PlatformAdapter, request: SuspendRequest<'_>) -> Result<SessionFile, ResumeError> {
    let resume_token = pvtx_runfolder::generate_run_id("TOK", |_candidate| false);
    let session = SessionFile {
        run_id: request.run_id.to_string(),
        entity_type: request.entity_type,
        state: SessionState::PendingResume,
        next_phase: request.next_phase,
        resume_token,
        resume_count: request.resume_count,
        current_node_index: request.current_node_index,
        current_child_run_id: request.current_child_run_id,
        current_iteration: request.current_iteration,
        case_resume: request.case_resume,
        target_ref: request.target_ref.map(str::to_string),
        roots: snapshot_roots(roots),
    };
    let delay_sec = request.delay_sec.unwrap_or(DEFAULT_REBOOT_DELAY_SEC);
    persist_and_schedule(&roots.runs_root, &session, delay_sec, platform)?;
    platform.reboot()?;
    Ok(session)
}

/// Overwrites `{runs_root}/{session.run_id}/session.json` with `session`
/// as-is, without scheduling a platform resume. Used by [`crate::Engine::resume`]
/// to make an advanced `resume_count` durable immediately, so it survives
/// on disk even if the resumed attempt does not itself request another
/// reboot before the process exits.
///
/// # Errors
///
/// Returns [`ResumeError::Write`] when the session file cannot be written.
pub fn persist_session(runs_root: &Path, session: &SessionFile) -> Result<(), ResumeError> {
    write_json_atomic(&session_file_path(runs_root, &session.run_id), session).map_err(ResumeError::Write)
}

/// Reads and parses `{runs_root}/{run_id}/session.json`.
///
/// # Errors
///
/// Returns [`ResumeError::Read`] when the file is missing or unreadable
/// and [`ResumeError::Parse`] when its contents do not parse.
pub fn load_session(runs_root: &Path, run_id: &str) -> Result<SessionFile, ResumeError> {
    let raw = std::fs::read_to_string(session_file_path(runs_root, run_id)).map_err(ResumeError::Read)?;
    serde_json::from_str(&raw).map_err(ResumeError::Parse)
}

/// Path to a run's `session.json`.
fn session_file_path(runs_root: &Path, run_id: &str) -> PathBuf {
    runs_root.join(run_id).join("session.json")
}

// ============================================================================
// SECTION: Resume-Count Enforcement
// ============================================================================

/// The outcome of checking a session against the engine's resume-count
/// ceiling.
#[derive(Debug, Clone, PartialEq)]
pub enum ResumeDecision {
    /// The session may be rescheduled for another resume attempt.
    Continue(SessionFile),
    /// The session has exceeded `max_resume_count`; it is finalized and
    /// must not be rescheduled.
    Exhausted(SessionFile),
}

/// Advances `session`'s resume counter and checks it against `limits`,
/// returning the event to record when the ceiling is exceeded.
#[must_use]
pub fn advance_resume(session: &SessionFile, limits: &EngineLimits) -> (ResumeDecision, Option<EventRecord>) {
    let advanced = session.advance_resume();
    if advanced.resume_count > limits.max_resume_count || matches!(advanced.state, SessionState::Finalized) {
        let event = EventRecord::new(EventSeverity::Warning, CODE_RESUME_COUNT_EXCEEDED, advanced.run_id.clone(), format!("resume count {} exceeds the configured ceiling of {}", advanced.resume_count, limits.max_resume_count));
        (ResumeDecision::Exhausted(advanced), Some(event))
    } else {
        (ResumeDecision::Continue(advanced), None)
    }
}

#[cfg(test)]
mod tests {
    use pvtx_config::RecordingPlatformAdapter;
    use tempfile::tempdir;

    use super::*;

    fn session(resume_count: u32) -> SessionFile {
        SessionFile {
            run_id: "S1700000000012".to_string(),
            entity_type: EntityResumeState::TestSuite,
            state: SessionState::PendingResume,
            next_phase: 1,
            resume_token: "token".to_string(),
            resume_count,
            current_node_index: Some(0),
            current_child_run_id: None,
            current_iteration: Some(0),
            case_resume: None,
            target_ref: Some("Suite1@1.0.0".to_string()),
            roots: RootsSnapshot {
                cases_root: PathBuf::from("/cases"),
                suites_root: PathBuf::from("/suites"),
                plans_root: PathBuf::from("/plans"),
                assets_root: PathBuf::from("/assets"),
                runs_root: PathBuf::from("/runs"),
            },
        }
    }

    #[test]
    fn resume_within_ceiling_continues() {
        let limits = EngineLimits { append_retry_backoff_ms: vec![10], default_timeout_sec: 300, max_resume_count: 1 };
        let (decision, event) = advance_resume(&session(0), &limits);
        assert!(matches!(decision, ResumeDecision::Continue(_)));
        assert!(event.is_none());
    }

    #[test]
    fn resume_past_ceiling_is_exhausted() {
        let limits = EngineLimits { append_retry_backoff_ms: vec![10], default_timeout_sec: 300, max_resume_count: 1 };
        let (decision, event) = advance_resume(&session(1), &limits);
        assert!(matches!(decision, ResumeDecision::Exhausted(_)));
        assert!(event.is_some());
    }

    #[test]
    fn session_round_trips_through_disk() {
        let dir = tempdir().expect("tempdir");
        let runs_root = dir.path();
        std::fs::create_dir_all(runs_root.join("S1700000000012")).expect("mkdir");
        let original = session(0);

        write_json_atomic(&session_file_path(runs_root, &original.run_id), &original).expect("write");
        let loaded = load_session(runs_root, &original.run_id).expect("load");
        assert_eq!(loaded, original);
    }

    #[test]
    fn suspend_for_reboot_persists_schedules_and_reboots() {
        let dir = tempdir().expect("tempdir");
        let runs_root = dir.path().join("runs");
        std::fs::create_dir_all(runs_root.join("S1700000000099")).expect("mkdir");
        let roots = Roots {
            cases_root: dir.path().join("cases"),
            suites_root: dir.path().join("suites"),
            plans_root: dir.path().join("plans"),
            assets_root: dir.path().join("assets"),
            runs_root: runs_root.clone(),
        };
        let platform = RecordingPlatformAdapter::new();
        let request = SuspendRequest {
            run_id: "S1700000000099",
            entity_type: EntityResumeState::TestSuite,
            next_phase: 1,
            current_node_index: Some(1),
            current_child_run_id: Some("R1700000000100".to_string()),
            current_iteration: Some(0),
            case_resume: None,
            target_ref: Some("Suite1@1.0.0"),
            delay_sec: Some(5),
            resume_count: 0,
        };

        let session = suspend_for_reboot(&roots, &platform, request).expect("suspends");

        assert_eq!(session.current_node_index, Some(1));
        assert_eq!(platform.reboot_count(), 1);
        let scheduled = platform.scheduled_commands();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].delay_sec, 5);
        assert_eq!(scheduled[0].resume_token, session.resume_token);

        let loaded = load_session(&runs_root, "S1700000000099").expect("load");
        assert_eq!(loaded, session);
    }

    #[test]
    fn suspend_for_reboot_carries_prior_resume_count() {
        let dir = tempdir().expect("tempdir");
        let runs_root = dir.path().join("runs");
        std::fs::create_dir_all(runs_root.join("S1700000000199")).expect("mkdir");
        let roots = Roots {
            cases_root: dir.path().join("cases"),
            suites_root: dir.path().join("suites"),
            plans_root: dir.path().join("plans"),
            assets_root: dir.path().join("assets"),
            runs_root: runs_root.clone(),
        };
        let platform = RecordingPlatformAdapter::new();
        let request = SuspendRequest {
            run_id: "S1700000000199",
            entity_type: EntityResumeState::TestSuite,
            next_phase: 2,
            current_node_index: Some(2),
            current_child_run_id: Some("R1700000000200".to_string()),
            current_iteration: Some(0),
            case_resume: None,
            target_ref: Some("Suite1@1.0.0"),
            delay_sec: Some(5),
            resume_count: 1,
        };

        let session = suspend_for_reboot(&roots, &platform, request).expect("suspends");

        assert_eq!(session.resume_count, 1);
        let (decision, _event) = advance_resume(&session, &EngineLimits { append_retry_backoff_ms: vec![10], default_timeout_sec: 300, max_resume_count: 1 });
        assert!(matches!(decision, ResumeDecision::Exhausted(_)), "a session that already carried resume_count 1 into its second suspend must trip the ceiling on its next resume");
    }
}
