// crates/pvtx-core/src/identity.rs
// ============================================================================
// Module: Entity Identity
// Description: Canonical `id@version` identity shared by cases, suites and
//              plans.
// Purpose: Provide a single parsing/formatting implementation so discovery,
//          refs and the index log agree byte-for-byte on identity strings.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! An [`Identity`] is the `id@version` pair described in the data model:
//! exactly one `@`, `id` restricted to `[A-Za-z0-9._-]+`, `version` taken
//! verbatim from the manifest (typically semver, but not validated as such).
//! Comparison and hashing are case-sensitive; both halves are
//! whitespace-trimmed before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Entity Kind
// ============================================================================

/// The three entity kinds that share one identity namespace.
///
/// # Invariants
/// - Variants are stable for serialization and error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A test case manifest.
    TestCase,
    /// A test suite manifest.
    TestSuite,
    /// A test plan manifest.
    TestPlan,
}

impl EntityKind {
    /// Returns the manifest file name associated with this entity kind.
    #[must_use]
    pub const fn manifest_file_name(self) -> &'static str {
        match self {
            Self::TestCase => "test.manifest.json",
            Self::TestSuite => "suite.manifest.json",
            Self::TestPlan => "plan.manifest.json",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::TestCase => "TestCase",
            Self::TestSuite => "TestSuite",
            Self::TestPlan => "TestPlan",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Identity Errors
// ============================================================================

/// Errors produced while parsing an [`Identity`] from its wire form.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// The string did not contain exactly one `@`.
    #[error("identity {raw:?} must contain exactly one '@'")]
    MalformedSeparator {
        /// The raw string that failed to parse.
        raw: String,
    },
    /// The `id` half was empty or contained disallowed characters.
    #[error("identity id {id:?} must match [A-Za-z0-9._-]+")]
    InvalidId {
        /// The offending `id` half.
        id: String,
    },
    /// The `version` half was empty after trimming.
    #[error("identity version must not be empty")]
    EmptyVersion,
}

fn is_valid_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

// ============================================================================
// SECTION: Identity
// ============================================================================

/// Canonical `id@version` identity for a test case, suite or plan.
///
/// # Invariants
/// - `id` matches `[A-Za-z0-9._-]+`.
/// - `version` is non-empty after trimming.
/// - Comparison is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity {
    id: String,
    version: String,
}

impl Identity {
    /// Builds an identity from already-validated parts.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when `id` or `version` is invalid.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Result<Self, IdentityError> {
        let id = id.into().trim().to_string();
        let version = version.into().trim().to_string();
        if id.is_empty() || !id.chars().all(is_valid_id_char) {
            return Err(IdentityError::InvalidId { id });
        }
        if version.is_empty() {
            return Err(IdentityError::EmptyVersion);
        }
        Ok(Self { id, version })
    }

    /// Parses an identity from its `id@version` wire form.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] when the string is malformed.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        let mut parts = trimmed.splitn(3, '@');
        let id_part = parts.next().unwrap_or_default();
        let version_part = parts.next();
        if version_part.is_none() || parts.next().is_some() || trimmed.matches('@').count() != 1 {
            return Err(IdentityError::MalformedSeparator {
                raw: raw.to_string(),
            });
        }
        Self::new(id_part, version_part.unwrap_or_default())
    }

    /// Returns the `id` half of the identity.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the `version` half of the identity.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.version)
    }
}

impl TryFrom<String> for Identity {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_string()
    }
}
