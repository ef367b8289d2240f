// crates/pvtx-contract/src/events.rs
// ============================================================================
// Module: Event Records
// Description: `events.jsonl` warning/info stream shape.
// Purpose: Give every subsystem a single stable shape to append
//          non-fatal, user-facing notices without inventing ad-hoc codes.
// Dependencies: pvtx-core, serde
// ============================================================================

//! ## Overview
//! `events.jsonl` is an append-only log of notable-but-non-fatal occurrences
//! during a run: a downgraded control, a secret that leaked onto a command
//! line, a node requesting a reboot. Codes are stable, dotted strings so
//! downstream tooling can match on them without parsing `message`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use pvtx_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Event Codes
// ============================================================================

/// `Controls.MaxParallel.Ignored` — a suite declared `maxParallel > 1` but
/// the engine core only ever schedules children sequentially.
pub const CODE_MAX_PARALLEL_IGNORED: &str = "Controls.MaxParallel.Ignored";

/// `EnvRef.SecretOnCommandLine` — an input resolved from a secret
/// environment reference but the case script declares it as a positional or
/// command-line argument rather than reading it from the environment.
pub const CODE_SECRET_ON_COMMAND_LINE: &str = "EnvRef.SecretOnCommandLine";

/// `TestCase.RebootRequested` — a case wrote a valid `control/reboot.json`.
pub const CODE_TEST_CASE_REBOOT_REQUESTED: &str = "TestCase.RebootRequested";

/// `Suite.ContinueOnFailure.NodeSkipped` — a node was skipped because an
/// earlier sibling failed under `continueOnFailure = false`.
pub const CODE_SUITE_NODE_SKIPPED: &str = "Suite.ContinueOnFailure.NodeSkipped";

/// `Session.Resume.CountExceeded` — a session's `resumeCount` exceeded the
/// configured ceiling and the run was finalized as `Error`.
pub const CODE_RESUME_COUNT_EXCEEDED: &str = "Session.Resume.CountExceeded";

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity of an [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventSeverity {
    /// Informational, no operator action implied.
    Info,
    /// A control or input was silently adjusted; worth operator attention.
    Warning,
}

// ============================================================================
// SECTION: Event Record
// ============================================================================

/// A single `events.jsonl` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Wall-clock time the event was recorded.
    pub time: Timestamp,
    /// Severity of the event.
    pub severity: EventSeverity,
    /// Stable, dotted event code (see the `CODE_*` constants).
    pub code: String,
    /// Run the event pertains to.
    pub run_id: String,
    /// Suite node id, present when the event is node-scoped.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub node_id: Option<String>,
    /// Human-readable detail.
    pub message: String,
}

impl EventRecord {
    /// Builds an event record stamped with the current time.
    #[must_use]
    pub fn new(severity: EventSeverity, code: &str, run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            time: Timestamp::now(),
            severity,
            code: code.to_string(),
            run_id: run_id.into(),
            node_id: None,
            message: message.into(),
        }
    }

    /// Attaches a node id to this event.
    #[must_use]
    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}
