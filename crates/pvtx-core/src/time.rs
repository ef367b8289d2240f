// crates/pvtx-core/src/time.rs
// ============================================================================
// Module: Canonical Timestamps
// Description: ISO-8601 UTC timestamps with a trailing `Z`, used everywhere a
//              run record needs a start/end time.
// Purpose: Eliminate the `DateTime.Now` vs `DateTime.UtcNow` inconsistency
//          flagged against the source implementation by fixing one
//          representation and one formatter.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Every persisted artifact timestamp is UTC and serializes with a trailing
//! `Z` (e.g. `2026-08-01T12:34:56.789Z`). [`Timestamp`] wraps
//! `time::OffsetDateTime` and is the only type engine code should use for
//! wall-clock values; callers that need a fixed point for tests construct one
//! explicitly rather than relying on `Timestamp::now` twice in the same
//! assertion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// A UTC timestamp serialized as ISO-8601 with a trailing `Z`.
///
/// # Invariants
/// - Always normalized to UTC before formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(OffsetDateTime);

impl Timestamp {
    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Wraps an existing `OffsetDateTime`, normalizing it to UTC.
    #[must_use]
    pub fn from_offset(dt: OffsetDateTime) -> Self {
        Self(dt.to_offset(time::UtcOffset::UTC))
    }

    /// Returns the wrapped `OffsetDateTime`.
    #[must_use]
    pub const fn as_offset(&self) -> OffsetDateTime {
        self.0
    }

    /// Returns the duration elapsed between `self` and `later`, clamped to
    /// zero if `later` precedes `self`.
    #[must_use]
    pub fn elapsed_until(&self, later: Timestamp) -> std::time::Duration {
        let delta = later.0 - self.0;
        delta.try_into().unwrap_or(std::time::Duration::ZERO)
    }

    /// Parses an RFC 3339 / ISO-8601 timestamp string.
    ///
    /// # Errors
    ///
    /// Returns a formatted error when `raw` is not a valid RFC 3339 string.
    pub fn parse(raw: &str) -> Result<Self, time::error::Parse> {
        OffsetDateTime::parse(raw, &Rfc3339).map(Self::from_offset)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let formatted = self
            .0
            .format(&Rfc3339)
            .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"));
        // `Rfc3339` emits a numeric offset (`+00:00`) for UTC; the contract
        // requires the literal `Z` suffix.
        let formatted = formatted
            .strip_suffix("+00:00")
            .map_or(formatted.clone(), |base| format!("{base}Z"));
        f.write_str(&formatted)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = time::error::Parse;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(value: Timestamp) -> Self {
        value.to_string()
    }
}
