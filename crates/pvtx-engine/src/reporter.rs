// crates/pvtx-engine/src/reporter.rs
// ============================================================================
// Module: Reporter
// Description: The observer seam every orchestrator level calls into as a
//              run progresses, independent of how that progress is
//              surfaced (CLI output, a channel, nothing at all).
// Purpose: Decouple the suite/plan state machines from any particular
//          presentation so a CLI, a test harness, and a future UI can all
//          subscribe to the same sequence of calls.
// Dependencies: pvtx-core, pvtx-contract
// ============================================================================

//! ## Overview
//! A [`Reporter`] receives exactly one call per lifecycle event, in the
//! order the event actually occurred: one [`Reporter::on_run_planned`],
//! one [`Reporter::on_node_started`]/[`Reporter::on_node_finished`] pair
//! per node attempt (a retried node produces one pair per attempt), any
//! number of [`Reporter::on_event`] calls interleaved at any point, and
//! exactly one terminal [`Reporter::on_run_finished`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use pvtx_contract::EventRecord;
use pvtx_core::Status;
use tokio::sync::mpsc::UnboundedSender;

// ============================================================================
// SECTION: Lifecycle Payloads
// ============================================================================

/// Announces the shape of a run before any node executes.
#[derive(Debug, Clone)]
pub struct RunPlanned {
    /// The run id minted for this run.
    pub run_id: String,
    /// Total number of node attempts the orchestrator expects to make in
    /// the common (non-retried, non-aborted) case.
    pub planned_node_count: usize,
}

/// Announces that one node attempt has begun executing.
#[derive(Debug, Clone)]
pub struct NodeStarted {
    /// The child run id minted for this node attempt.
    pub run_id: String,
    /// The suite node id, when this attempt belongs to a suite.
    pub node_id: Option<String>,
    /// One-based attempt number within this node's retry budget.
    pub attempt: u32,
}

/// Announces that one node attempt has finished.
#[derive(Debug, Clone)]
pub struct NodeFinished {
    /// The child run id this outcome belongs to.
    pub run_id: String,
    /// The suite node id, when this attempt belongs to a suite.
    pub node_id: Option<String>,
    /// The attempt's terminal status.
    pub status: Status,
}

/// Announces that an entire run (case, suite or plan) has reached a
/// terminal status.
#[derive(Debug, Clone)]
pub struct RunFinished {
    /// The run id this outcome belongs to.
    pub run_id: String,
    /// The run's aggregate terminal status.
    pub status: Status,
}

// ============================================================================
// SECTION: Reporter Trait
// ============================================================================

/// Observes orchestrator lifecycle events. Implementors must not block the
/// calling orchestration task for long; a channel-backed implementation is
/// preferred over synchronous I/O from inside these callbacks.
pub trait Reporter: Send + Sync {
    /// Called once, before the first node attempt begins.
    fn on_run_planned(&self, planned: RunPlanned);

    /// Called once per node attempt, immediately before it is dispatched.
    fn on_node_started(&self, started: NodeStarted);

    /// Called once per node attempt, immediately after it reaches a
    /// terminal status.
    fn on_node_finished(&self, finished: NodeFinished);

    /// Called for an out-of-band event (a skipped node, a downgraded
    /// control, a resume-count ceiling) that does not correspond to a
    /// node attempt's own start/finish pair.
    fn on_event(&self, event: &EventRecord);

    /// Called exactly once, when the run as a whole reaches a terminal
    /// status.
    fn on_run_finished(&self, finished: RunFinished);
}

// ============================================================================
// SECTION: Null Reporter
// ============================================================================

/// A [`Reporter`] that discards every event. Used where no observer is
/// configured and by tests that only care about the returned result.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn on_run_planned(&self, _planned: RunPlanned) {}

    fn on_node_started(&self, _started: NodeStarted) {}

    fn on_node_finished(&self, _finished: NodeFinished) {}

    fn on_event(&self, _event: &EventRecord) {}

    fn on_run_finished(&self, _finished: RunFinished) {}
}

// ============================================================================
// SECTION: Channel Reporter
// ============================================================================

/// One lifecycle event, as forwarded over a [`ChannelReporter`]'s channel.
#[derive(Debug, Clone)]
pub enum ReporterEvent {
    /// Forwarded from [`Reporter::on_run_planned`].
    RunPlanned(RunPlanned),
    /// Forwarded from [`Reporter::on_node_started`].
    NodeStarted(NodeStarted),
    /// Forwarded from [`Reporter::on_node_finished`].
    NodeFinished(NodeFinished),
    /// Forwarded from [`Reporter::on_event`].
    Event(EventRecord),
    /// Forwarded from [`Reporter::on_run_finished`].
    RunFinished(RunFinished),
}

/// A [`Reporter`] that forwards every event onto an unbounded channel, for
/// a CLI or test harness to drain on its own task.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    /// The sending half of the channel events are forwarded onto.
    sender: UnboundedSender<ReporterEvent>,
}

impl ChannelReporter {
    /// Wraps `sender` as a [`Reporter`].
    #[must_use]
    pub const fn new(sender: UnboundedSender<ReporterEvent>) -> Self {
        Self { sender }
    }
}

impl Reporter for ChannelReporter {
    fn on_run_planned(&self, planned: RunPlanned) {
        let _ignored = self.sender.send(ReporterEvent::RunPlanned(planned));
    }

    fn on_node_started(&self, started: NodeStarted) {
        let _ignored = self.sender.send(ReporterEvent::NodeStarted(started));
    }

    fn on_node_finished(&self, finished: NodeFinished) {
        let _ignored = self.sender.send(ReporterEvent::NodeFinished(finished));
    }

    fn on_event(&self, event: &EventRecord) {
        let _ignored = self.sender.send(ReporterEvent::Event(event.clone()));
    }

    fn on_run_finished(&self, finished: RunFinished) {
        let _ignored = self.sender.send(ReporterEvent::RunFinished(finished));
    }
}
