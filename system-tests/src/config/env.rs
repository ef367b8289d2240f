// system-tests/src/config/env.rs
// ============================================================================
// Module: System Test Environment
// Description: Environment-backed configuration for system tests.
// Purpose: Centralize env parsing with strict UTF-8 validation.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Environment values are parsed with strict UTF-8 enforcement to avoid silent
//! misconfiguration. Invalid UTF-8 fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for system test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemTestEnv {
    /// Optional runs-root override, used in place of a fresh tempdir.
    RunRoot,
    /// Optional per-case timeout override (seconds).
    TimeoutSeconds,
}

impl SystemTestEnv {
    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RunRoot => "PVTX_SYSTEM_TEST_RUN_ROOT",
            Self::TimeoutSeconds => "PVTX_SYSTEM_TEST_TIMEOUT_SEC",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed system test configuration derived from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemTestConfig {
    /// Optional runs-root override.
    pub run_root: Option<PathBuf>,
    /// Optional per-case timeout override.
    pub timeout: Option<Duration>,
}

impl SystemTestConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error when an environment value is not valid UTF-8, when
    /// `RunRoot` is present but empty, or when `TimeoutSeconds` is present
    /// but not a positive integer.
    pub fn load() -> Result<Self, String> {
        let run_root = read_env_strict(SystemTestEnv::RunRoot.as_str())?;
        let run_root = run_root.map(|value| parse_nonempty(&SystemTestEnv::RunRoot, &value)).transpose()?.map(PathBuf::from);

        let timeout = read_env_strict(SystemTestEnv::TimeoutSeconds.as_str())?;
        let timeout = timeout.map(|value| parse_positive_seconds(&value)).transpose()?;

        Ok(Self { run_root, timeout })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads an environment variable and enforces UTF-8 validity.
///
/// # Errors
///
/// Returns an error when the environment variable contains invalid UTF-8.
pub fn read_env_strict(name: &str) -> Result<Option<String>, String> {
    std::env::var_os(name).map_or(Ok(None), |raw| {
        raw.into_string().map(Some).map_err(|_| format!("{name} must be valid UTF-8"))
    })
}

/// Rejects an empty value for a variable that must name something real.
fn parse_nonempty(key: &SystemTestEnv, value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err(format!("{} must not be empty", key.as_str()));
    }
    Ok(value.to_string())
}

/// Parses a strictly positive integer number of seconds.
fn parse_positive_seconds(value: &str) -> Result<Duration, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed != value {
        return Err(format!("{} must be a positive integer", SystemTestEnv::TimeoutSeconds.as_str()));
    }
    let seconds: u64 = trimmed.parse().map_err(|_err| format!("{} must be a positive integer", SystemTestEnv::TimeoutSeconds.as_str()))?;
    if seconds == 0 {
        return Err(format!("{} must be greater than zero", SystemTestEnv::TimeoutSeconds.as_str()));
    }
    Ok(Duration::from_secs(seconds))
}
