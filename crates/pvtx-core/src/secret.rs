// crates/pvtx-core/src/secret.rs
// ============================================================================
// Module: Secret Values
// Description: Wrapper that keeps a value usable for execution while
//              rendering a redaction placeholder everywhere else.
// Purpose: Make "never write a secret to disk" a type-level property instead
//          of a convention every writer has to remember.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Secret<T>`] pairs a value with a `secret` flag. `Display` and `Serialize`
//! always render the redaction placeholder when the flag is set; the literal
//! value is reachable only through [`Secret::expose_for_exec`], which every
//! call site names explicitly so a code reviewer can grep for the one place
//! secrets leave the type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Placeholder substituted for any value whose secret flag is set.
pub const REDACTION_PLACEHOLDER: &str = "***";

// ============================================================================
// SECTION: Secret
// ============================================================================

/// A value plus the redaction marker controlling how it is displayed.
///
/// # Invariants
/// - `is_secret` never changes after construction.
/// - [`Secret::expose_for_exec`] is the only way to read the literal value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secret<T> {
    value: T,
    is_secret: bool,
}

impl<T> Secret<T> {
    /// Wraps a non-secret value.
    #[must_use]
    pub const fn plain(value: T) -> Self {
        Self {
            value,
            is_secret: false,
        }
    }

    /// Wraps a value flagged as secret.
    #[must_use]
    pub const fn redacted(value: T) -> Self {
        Self {
            value,
            is_secret: true,
        }
    }

    /// Wraps `value`, flagging it secret when `is_secret` is true.
    #[must_use]
    pub const fn new(value: T, is_secret: bool) -> Self {
        Self { value, is_secret }
    }

    /// Returns whether this value must be redacted in persisted artifacts.
    #[must_use]
    pub const fn is_secret(&self) -> bool {
        self.is_secret
    }

    /// Returns the literal value for use building a subprocess argv/env.
    ///
    /// Named explicitly so every call site documents that it is handling a
    /// value which must not subsequently be persisted.
    #[must_use]
    pub const fn expose_for_exec(&self) -> &T {
        &self.value
    }

    /// Maps the inner value, preserving the secret flag.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Secret<U> {
        Secret {
            value: f(self.value),
            is_secret: self.is_secret,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_secret {
            f.write_str(REDACTION_PLACEHOLDER)
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl<T: Serialize> Serialize for Secret<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_secret {
            serializer.serialize_str(REDACTION_PLACEHOLDER)
        } else {
            self.value.serialize(serializer)
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Secret<T> {
    /// Deserializes the inner value as plain.
    ///
    /// Redaction is one-way: once a secret has been serialized to
    /// [`REDACTION_PLACEHOLDER`], the original value and flag cannot be
    /// recovered from disk. Readers that need the literal value again must
    /// re-resolve it from its source rather than round-trip a persisted
    /// artifact.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Self::plain)
    }
}

/// Redacts `text` if it contains any of the `needles`, replacing each
/// occurrence with [`REDACTION_PLACEHOLDER`].
///
/// Used to scrub secret-sourced literal values out of log lines before they
/// are appended to `stdout.log`/`stderr.log`.
#[must_use]
pub fn redact_line(text: &str, needles: &[String]) -> String {
    let mut out = text.to_string();
    for needle in needles {
        if needle.is_empty() {
            continue;
        }
        out = out.replace(needle.as_str(), REDACTION_PLACEHOLDER);
    }
    out
}
