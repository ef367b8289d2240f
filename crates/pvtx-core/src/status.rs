// crates/pvtx-core/src/status.rs
// ============================================================================
// Module: Run Status
// Description: Terminal statuses for case/suite/plan runs and their
//              aggregation precedence.
// Purpose: Centralize the `Error > Timeout > Failed > Aborted > Passed`
//          ordering so every orchestrator layer folds the same way.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Status`] is the terminal outcome of a case, suite or plan run.
//! [`Status::aggregate`] folds a sequence of child statuses into one group
//! status under the precedence rule from the data model: reboot
//! short-circuits, user abort overrides everything else, and otherwise
//! `Error > Timeout > Failed > Aborted > Passed`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Status
// ============================================================================

/// Terminal status of a case, suite or plan run.
///
/// # Invariants
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Status {
    /// The run completed successfully.
    Passed,
    /// The run completed with a non-zero, script-reported failure.
    Failed,
    /// The run failed due to a runner- or script-side exception.
    Error,
    /// The run was killed after exceeding its timeout.
    Timeout,
    /// The run was killed by a user-issued cancellation.
    Aborted,
    /// The run's process wrote a valid reboot request and stopped early.
    RebootRequired,
}

impl Status {
    /// Returns the precedence rank used for aggregation, excluding
    /// [`Status::RebootRequired`] which is handled as a short-circuit by the
    /// caller before ranks are ever compared.
    ///
    /// Higher rank wins. `Error > Timeout > Failed > Aborted > Passed`.
    const fn precedence_rank(self) -> u8 {
        match self {
            Self::Error => 4,
            Self::Timeout => 3,
            Self::Failed => 2,
            Self::Aborted => 1,
            Self::Passed => 0,
            Self::RebootRequired => 0,
        }
    }

    /// Folds one more child status into a running aggregate.
    ///
    /// Reboot short-circuits to [`Status::RebootRequired`] and stays there
    /// regardless of subsequent inputs; the caller is expected to stop
    /// folding once that happens. User abort is modeled by the caller
    /// passing [`Status::Aborted`] for every remaining node, which this
    /// function folds using the normal precedence (`Aborted` outranks
    /// `Passed` but not `Error`/`Timeout`/`Failed`) — callers that must make
    /// abort override everything should call [`Status::force_aborted`]
    /// instead once cancellation is observed.
    #[must_use]
    pub const fn fold(self, next: Self) -> Self {
        if matches!(self, Self::RebootRequired) || matches!(next, Self::RebootRequired) {
            return Self::RebootRequired;
        }
        if next.precedence_rank() >= self.precedence_rank() {
            next
        } else {
            self
        }
    }

    /// Aggregates a sequence of child statuses per the precedence rule.
    /// Returns [`Status::Passed`] for an empty sequence.
    #[must_use]
    pub fn aggregate(statuses: impl IntoIterator<Item = Self>) -> Self {
        statuses
            .into_iter()
            .fold(Self::Passed, |acc, next| acc.fold(next))
    }

    /// Returns true when the status should trigger a retry under
    /// `controls.retryOnError`. Only `Error` and `Timeout` are retried.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Error | Self::Timeout)
    }

    /// Returns true when the status represents a successful terminal state.
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Forces the aggregate to [`Status::Aborted`] once cancellation has
    /// been observed, so no later precedence folding can resurrect an
    /// `Error`/`Timeout`/`Failed` outcome over the user's abort. A pending
    /// [`Status::RebootRequired`] still takes precedence, since a reboot
    /// already in flight is not something cancellation can unwind.
    #[must_use]
    pub const fn force_aborted(self) -> Self {
        if matches!(self, Self::RebootRequired) {
            self
        } else {
            Self::Aborted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_orders_error_above_everything() {
        let agg = Status::aggregate([Status::Passed, Status::Failed, Status::Error]);
        assert_eq!(agg, Status::Error);
    }

    #[test]
    fn precedence_orders_timeout_above_failed() {
        let agg = Status::aggregate([Status::Failed, Status::Timeout]);
        assert_eq!(agg, Status::Timeout);
    }

    #[test]
    fn precedence_orders_failed_above_aborted() {
        let agg = Status::aggregate([Status::Aborted, Status::Failed]);
        assert_eq!(agg, Status::Failed);
    }

    #[test]
    fn reboot_short_circuits_regardless_of_order() {
        let agg = Status::aggregate([Status::Error, Status::RebootRequired, Status::Passed]);
        assert_eq!(agg, Status::RebootRequired);
    }

    #[test]
    fn empty_sequence_is_passed() {
        assert_eq!(Status::aggregate(std::iter::empty()), Status::Passed);
    }

    #[test]
    fn only_error_and_timeout_are_retryable() {
        assert!(Status::Error.is_retryable());
        assert!(Status::Timeout.is_retryable());
        assert!(!Status::Passed.is_retryable());
        assert!(!Status::Failed.is_retryable());
        assert!(!Status::Aborted.is_retryable());
    }
}
