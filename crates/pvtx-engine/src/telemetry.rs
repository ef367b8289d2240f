// crates/pvtx-engine/src/telemetry.rs
// ============================================================================
// Module: Telemetry
// Description: Counters for node attempts, retries, timeouts and reboots,
//              decoupled from the Reporter's per-run event stream.
// Purpose: Let an operator track engine-wide health (how often timeouts or
//          reboots occur across many runs) without parsing every run's
//          event log.
// Dependencies: pvtx-core
// ============================================================================

//! ## Overview
//! [`Telemetry`] is deliberately narrower than [`crate::reporter::Reporter`]:
//! it records counts, not a replayable sequence, and is expected to live
//! for the lifetime of the engine process rather than one run. A
//! [`ReporterTelemetry`] adapter is provided for callers that only have a
//! [`crate::reporter::Reporter`] handle and want a best-effort telemetry
//! sink derived from it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use pvtx_contract::EventRecord;
use pvtx_contract::EventSeverity;
use pvtx_core::Status;

use crate::reporter::Reporter;

// ============================================================================
// SECTION: Telemetry Trait
// ============================================================================

/// Records engine-wide counters. Every method is a fire-and-forget
/// increment; implementors must not fail or block the orchestrator.
pub trait Telemetry: Send + Sync {
    /// Records one node attempt reaching a terminal status.
    fn record_node_attempt(&self, status: Status);

    /// Records one node attempt being retried after `Error`/`Timeout`.
    fn record_retry(&self);

    /// Records one case requesting a reboot via `control/reboot.json`.
    fn record_reboot_requested(&self);

    /// Records one run resuming after a reboot.
    fn record_resume(&self);
}

// ============================================================================
// SECTION: Null Telemetry
// ============================================================================

/// A [`Telemetry`] that discards every count.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTelemetry;

impl Telemetry for NullTelemetry {
    fn record_node_attempt(&self, _status: Status) {}

    fn record_retry(&self) {}

    fn record_reboot_requested(&self) {}

    fn record_resume(&self) {}
}

// ============================================================================
// SECTION: In-Process Counters
// ============================================================================

/// An in-process [`Telemetry`] sink backed by atomic counters, for an
/// engine host that wants to expose counts without standing up a metrics
/// exporter.
#[derive(Debug, Default)]
pub struct CountingTelemetry {
    /// Count of node attempts reaching [`Status::Passed`].
    passed: AtomicU64,
    /// Count of node attempts reaching a non-passed terminal status.
    non_passed: AtomicU64,
    /// Count of retries issued after `Error`/`Timeout`.
    retries: AtomicU64,
    /// Count of reboot requests observed.
    reboots_requested: AtomicU64,
    /// Count of resumes completed.
    resumes: AtomicU64,
}

/// A point-in-time snapshot of a [`CountingTelemetry`]'s counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetrySnapshot {
    /// Node attempts that reached [`Status::Passed`].
    pub passed: u64,
    /// Node attempts that reached any other terminal status.
    pub non_passed: u64,
    /// Retries issued after `Error`/`Timeout`.
    pub retries: u64,
    /// Reboot requests observed.
    pub reboots_requested: u64,
    /// Resumes completed.
    pub resumes: u64,
}

impl CountingTelemetry {
    /// Builds a fresh, zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the current counter values.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            passed: self.passed.load(Ordering::Relaxed),
            non_passed: self.non_passed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            reboots_requested: self.reboots_requested.load(Ordering::Relaxed),
            resumes: self.resumes.load(Ordering::Relaxed),
        }
    }
}

impl Telemetry for CountingTelemetry {
    fn record_node_attempt(&self, status: Status) {
        let counter = if status.is_passed() { &self.passed } else { &self.non_passed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    fn record_reboot_requested(&self) {
        self.reboots_requested.fetch_add(1, Ordering::Relaxed);
    }

    fn record_resume(&self) {
        self.resumes.fetch_add(1, Ordering::Relaxed);
    }
}

// ============================================================================
// SECTION: Reporter Adapter
// ============================================================================

/// Code for the synthetic event [`ReporterTelemetry`] emits on retry,
/// since retries have no dedicated contract event code of their own.
const CODE_NODE_RETRIED: &str = "Node.Retried";

/// Adapts a [`Reporter`] into a [`Telemetry`] sink by emitting synthetic
/// `on_event` calls, for callers that have a run-scoped reporter but want
/// its counters reflected without threading a second trait object through
/// the orchestrator.
#[derive(Clone)]
pub struct ReporterTelemetry {
    /// The run id synthetic events are stamped with.
    run_id: String,
    /// The reporter events are forwarded to.
    reporter: Arc<dyn Reporter>,
}

impl ReporterTelemetry {
    /// Builds an adapter stamping every synthetic event with `run_id`.
    #[must_use]
    pub fn new(run_id: impl Into<String>, reporter: Arc<dyn Reporter>) -> Self {
        Self { run_id: run_id.into(), reporter }
    }
}

impl Telemetry for ReporterTelemetry {
    fn record_node_attempt(&self, _status: Status) {}

    fn record_retry(&self) {
        let event = EventRecord::new(EventSeverity::Info, CODE_NODE_RETRIED, self.run_id.clone(), "node attempt retried after error or timeout");
        self.reporter.on_event(&event);
    }

    fn record_reboot_requested(&self) {}

    fn record_resume(&self) {}
}
