// crates/pvtx-cli/src/reporter.rs
// ============================================================================
// Module: Console Reporter
// Description: Drains a `ChannelReporter`'s channel and formats each event
//              as a line of human-readable progress on stdout/stderr.
// Purpose: Give the CLI a `Reporter` it can watch without blocking the
//          orchestrator task that is emitting events.
// Dependencies: pvtx-engine, pvtx-contract, tokio
// ============================================================================

//! ## Overview
//! [`run_console_drain`] owns a background task that reads
//! [`pvtx_engine::reporter::ReporterEvent`] values off an unbounded channel
//! and writes one formatted line per event, until the sender side (held by
//! the orchestrator) is dropped. Output goes to stdout for lifecycle
//! events and stderr for `Warning`-severity [`pvtx_contract::EventRecord`]s,
//! matching the convention that progress is stdout and anything the
//! operator should notice is stderr.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;

use pvtx_contract::EventSeverity;
use pvtx_core::Status;
use pvtx_engine::reporter::ReporterEvent;
use tokio::sync::mpsc::UnboundedReceiver;

/// Drains `events` to completion, writing one formatted line per event.
///
/// Write failures are swallowed rather than propagated: a broken stdout
/// pipe must never abort the run it is merely reporting on.
pub async fn run_console_drain(mut events: UnboundedReceiver<ReporterEvent>) {
    while let Some(event) = events.recv().await {
        format_event(&event);
    }
}

/// Formats and writes a single [`ReporterEvent`].
fn format_event(event: &ReporterEvent) {
    match event {
        ReporterEvent::RunPlanned(planned) => {
            write_stdout(&format!("[{}] planned {} node attempt(s)", planned.run_id, planned.planned_node_count));
        }
        ReporterEvent::NodeStarted(started) => {
            let node = started.node_id.as_deref().unwrap_or("-");
            write_stdout(&format!("[{}] node {node} attempt {} started", started.run_id, started.attempt));
        }
        ReporterEvent::NodeFinished(finished) => {
            let node = finished.node_id.as_deref().unwrap_or("-");
            write_stdout(&format!("[{}] node {node} finished: {}", finished.run_id, status_label(finished.status)));
        }
        ReporterEvent::Event(record) => {
            let line = format!("[{}] {} ({}): {}", record.run_id, record.code, severity_label(record.severity), record.message);
            match record.severity {
                EventSeverity::Warning => write_stderr(&line),
                EventSeverity::Info => write_stdout(&line),
            }
        }
        ReporterEvent::RunFinished(finished) => {
            write_stdout(&format!("[{}] run finished: {}", finished.run_id, status_label(finished.status)));
        }
    }
}

/// Renders a [`Status`] as the short label used in console output.
const fn status_label(status: Status) -> &'static str {
    match status {
        Status::Passed => "Passed",
        Status::Failed => "Failed",
        Status::Error => "Error",
        Status::Timeout => "Timeout",
        Status::Aborted => "Aborted",
        Status::RebootRequired => "RebootRequired",
    }
}

/// Renders an [`EventSeverity`] as the short label used in console output.
const fn severity_label(severity: EventSeverity) -> &'static str {
    match severity {
        EventSeverity::Info => "info",
        EventSeverity::Warning => "warning",
    }
}

/// Writes one line to stdout, discarding any write failure.
fn write_stdout(line: &str) {
    let mut stdout = std::io::stdout();
    let _ignored = writeln!(stdout, "{line}");
}

/// Writes one line to stderr, discarding any write failure.
fn write_stderr(line: &str) {
    let mut stderr = std::io::stderr();
    let _ignored = writeln!(stderr, "{line}");
}
