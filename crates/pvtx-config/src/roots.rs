// crates/pvtx-config/src/roots.rs
// ============================================================================
// Module: Resolved Roots
// Description: The five filesystem roots the engine operates over.
// Purpose: Give every subsystem one validated, canonical view of where
//          cases, suites, plans, runs and shared assets live.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`Roots`] value is resolved once at engine startup (or restored from a
//! persisted session snapshot on resume) and threaded through discovery,
//! the orchestrators and the runner. Validation is limited to structural
//! sanity (non-empty, bounded length); existence is checked lazily by the
//! subsystem that first needs a given root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::load::ConfigError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted length, in bytes, of a configured root path.
pub(crate) const MAX_ROOT_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Roots
// ============================================================================

/// The five filesystem roots the engine core reads from or writes into.
///
/// # Invariants
/// - None of the five paths may be empty after trimming.
/// - `assets_root` is the parent of `cases_root` per the data model's
///   `PVTX_ASSETS_ROOT` convention, but this is a deployment convention, not
///   an enforced invariant of this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roots {
    /// Root directory containing test-case manifests.
    pub cases_root: PathBuf,
    /// Root directory containing suite manifests.
    pub suites_root: PathBuf,
    /// Root directory containing plan manifests.
    pub plans_root: PathBuf,
    /// Root directory containing run folders and the global index log.
    pub runs_root: PathBuf,
    /// Root directory containing shared assets (scripts, modules).
    pub assets_root: PathBuf,
}

impl Roots {
    /// Validates every root path for structural sanity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a root is empty or exceeds
    /// [`MAX_ROOT_PATH_LENGTH`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_root("casesRoot", &self.cases_root)?;
        validate_root("suitesRoot", &self.suites_root)?;
        validate_root("plansRoot", &self.plans_root)?;
        validate_root("runsRoot", &self.runs_root)?;
        validate_root("assetsRoot", &self.assets_root)?;
        Ok(())
    }

    /// Returns the platform module search path root,
    /// `<assetsRoot>/PowerShell/Modules`, per the predefined-variable table.
    #[must_use]
    pub fn modules_root(&self) -> PathBuf {
        self.assets_root.join("PowerShell").join("Modules")
    }
}

/// Validates a single root path for structural sanity.
fn validate_root(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must not be empty")));
    }
    let len = path.as_os_str().len();
    if len > MAX_ROOT_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Roots {
        Roots {
            cases_root: PathBuf::from("/pvtx/cases"),
            suites_root: PathBuf::from("/pvtx/suites"),
            plans_root: PathBuf::from("/pvtx/plans"),
            runs_root: PathBuf::from("/pvtx/runs"),
            assets_root: PathBuf::from("/pvtx"),
        }
    }

    #[test]
    fn valid_roots_pass() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_root_is_rejected() {
        let mut roots = sample();
        roots.cases_root = PathBuf::new();
        assert!(roots.validate().is_err());
    }

    #[test]
    fn modules_root_nests_under_assets_root() {
        let roots = sample();
        assert_eq!(roots.modules_root(), PathBuf::from("/pvtx/PowerShell/Modules"));
    }
}
