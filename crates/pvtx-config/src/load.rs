// crates/pvtx-config/src/load.rs
// ============================================================================
// Module: Config Loading
// Description: TOML file loading with environment-variable root overrides.
// Purpose: Give the CLI one fail-closed entry point that resolves roots and
//          limits from a config file, then lets deployment-specific env
//          vars override individual roots without editing the file.
// Dependencies: pvtx-config::roots, pvtx-config::limits, toml
// ============================================================================

//! ## Overview
//! Configuration is a TOML file with a `[roots]` table and an optional
//! `[limits]` table. Every root may additionally be overridden by a
//! `PVTX_*_ROOT` environment variable, applied after the file is parsed so
//! a single packaged config can be repointed per machine without edits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::limits::EngineLimits;
use crate::roots::Roots;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "pvtx.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PVTX_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;

/// Environment variables that override an individual resolved root, in
/// `(field, var name)` order.
const ROOT_ENV_OVERRIDES: [(&str, &str); 5] = [
    ("cases_root", "PVTX_CASES_ROOT"),
    ("suites_root", "PVTX_SUITES_ROOT"),
    ("plans_root", "PVTX_PLANS_ROOT"),
    ("runs_root", "PVTX_RUNS_ROOT"),
    ("assets_root", "PVTX_ASSETS_ROOT"),
];

// ============================================================================
// SECTION: Config Error
// ============================================================================

/// Failure loading or validating a [`PvtxConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// I/O failure while reading the config file.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Structurally invalid configuration.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Config
// ============================================================================

/// Top-level engine configuration: resolved roots plus tunable limits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PvtxConfig {
    /// Filesystem roots.
    pub roots: Roots,
    /// Engine limits and retry schedules.
    #[serde(default)]
    pub limits: EngineLimits,
}

impl PvtxConfig {
    /// Loads configuration from `path`, or from the default resolution
    /// rules (the `PVTX_CONFIG` environment variable, falling back to
    /// `pvtx.toml` in the working directory) when `path` is `None`.
    ///
    /// After parsing, each root in `[roots]` is overridden by its
    /// corresponding `PVTX_*_ROOT` environment variable when one is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read,
    /// [`ConfigError::Parse`] when it is not valid TOML, or
    /// [`ConfigError::Invalid`] when the parsed roots fail validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes).map_err(|_unused| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.apply_root_env_overrides();
        config.roots.validate()?;
        Ok(config)
    }

    /// Applies any set `PVTX_*_ROOT` environment variable over the
    /// corresponding parsed root.
    fn apply_root_env_overrides(&mut self) {
        for (field, var) in ROOT_ENV_OVERRIDES {
            let Ok(value) = env::var(var) else { continue };
            let path = PathBuf::from(value);
            match field {
                "cases_root" => self.roots.cases_root = path,
                "suites_root" => self.roots.suites_root = path,
                "plans_root" => self.roots.plans_root = path,
                "runs_root" => self.roots.runs_root = path,
                "assets_root" => self.roots.assets_root = path,
                _ => {}
            }
        }
    }
}

// ============================================================================
// SECTION: Path Resolution
// ============================================================================

/// Resolves the config path from the explicit argument, the environment
/// variable, or the default filename, in that order.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use tempfile::tempdir;

    use super::*;

    static ENV_GUARD: Mutex<()> = Mutex::new(());

    fn sample_toml() -> &'static str {
        r#"
        [roots]
        casesRoot = "/pvtx/cases"
        suitesRoot = "/pvtx/suites"
        plansRoot = "/pvtx/plans"
        runsRoot = "/pvtx/runs"
        assetsRoot = "/pvtx"
        "#
    }

    #[test]
    fn loads_roots_and_default_limits() {
        let _guard = ENV_GUARD.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pvtx.toml");
        fs::write(&path, sample_toml()).expect("write config");

        let config = PvtxConfig::load(Some(&path)).expect("loads");
        assert_eq!(config.roots.cases_root, PathBuf::from("/pvtx/cases"));
        assert_eq!(config.limits, EngineLimits::default());
    }

    #[test]
    #[allow(unsafe_code, reason = "std::env::set_var is unsafe in this edition; serialized by ENV_GUARD")]
    fn env_override_wins_over_file() {
        let _guard = ENV_GUARD.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pvtx.toml");
        fs::write(&path, sample_toml()).expect("write config");

        // SAFETY: serialized by ENV_GUARD; no other thread in this process
        // reads or writes PVTX_CASES_ROOT concurrently.
        unsafe {
            env::set_var("PVTX_CASES_ROOT", "/override/cases");
        }
        let config = PvtxConfig::load(Some(&path)).expect("loads");
        unsafe {
            env::remove_var("PVTX_CASES_ROOT");
        }
        assert_eq!(config.roots.cases_root, PathBuf::from("/override/cases"));
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("pvtx.toml");
        fs::write(&path, "not valid toml =====").expect("write config");
        let err = PvtxConfig::load(Some(&path)).expect_err("must fail to parse");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
