// crates/pvtx-engine/src/env.rs
// ============================================================================
// Module: Environment Resolver
// Description: Layers plan/suite/case environment maps and injects the
//              predefined `PVTX_*` variables every case script can rely on.
// Purpose: Give every orchestrator level one function that turns the
//          manifest chain's environment maps plus a request's
//          `environmentOverrides` into the exact `env.json` snapshot.
// Dependencies: pvtx-core, pvtx-config
// ============================================================================

//! ## Overview
//! Environment resolution is a strict layered merge, lowest priority first:
//! the engine process's own OS environment, plan environment, suite
//! environment, a request's `environmentOverrides`, then the engine's own
//! predefined variables (which a user override cannot shadow). The merge
//! never fails; it only produces a flat `{name: value}` map plus the
//! module search path prefix a script needs to `Import-Module` from the
//! assets root.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use pvtx_core::Identity;
use pvtx_core::Secret;
use pvtx_core::manifest::PlanEnvironment;
use pvtx_core::manifest::SuiteEnvironment;

/// Name of the environment variable holding the module search path,
/// prepended with the assets root's `Modules` directory.
const PSMODULEPATH: &str = "PSModulePath";

// ============================================================================
// SECTION: Layer Inputs
// ============================================================================

/// The manifest-declared environment layers contributing to one case run,
/// in increasing priority order.
#[derive(Debug, Clone)]
pub struct EnvironmentLayers<'a> {
    /// The owning plan's environment, when the run is plan-scoped.
    pub plan: Option<&'a PlanEnvironment>,
    /// The owning suite's environment, when the run is suite- or
    /// plan-scoped.
    pub suite: Option<&'a SuiteEnvironment>,
    /// The request's `environmentOverrides.env`, legal at every scope.
    pub request_overrides: &'a BTreeMap<String, String>,
}

/// Identifying and location context stamped into the predefined `PVTX_*`
/// variables.
#[derive(Debug, Clone)]
pub struct PredefinedContext<'a> {
    /// Absolute path to the case's manifest directory.
    pub test_case_path: &'a Path,
    /// The case's declared name, taken from its identity.
    pub test_case_identity: &'a Identity,
    /// Absolute path to the assets root (`Roots::assets_root`).
    pub assets_root: &'a Path,
    /// Absolute path to the PowerShell modules root
    /// (`Roots::modules_root()`).
    pub modules_root: &'a Path,
    /// The run id of the case currently executing.
    pub run_id: &'a str,
    /// The resume phase counter for this run, `0` on a first attempt.
    pub phase: u32,
    /// Absolute path to the case run folder's `control` directory.
    pub control_dir: &'a Path,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves the final `{name: value}` environment map for one case run.
///
/// Layers merge lowest-priority first: a read-only snapshot of the engine
/// process's own OS environment, captured fresh for this node, then plan,
/// then suite, then request overrides; the predefined `PVTX_*` variables
/// are applied last and always win, since a script must be able to trust
/// them regardless of what an operator put in an override map.
/// `PSModulePath` is prepended (not replaced) with the modules root so a
/// script's own module search path is never destroyed by an override. The
/// OS-env seed is load-bearing: `spawn` launches every script with
/// `Command::env_clear()`, so without it a script would start with no
/// `PATH`/`SystemRoot` at all.
#[must_use]
pub fn resolve_environment(layers: &EnvironmentLayers<'_>, predefined: &PredefinedContext<'_>) -> BTreeMap<String, Secret<String>> {
    let mut merged: BTreeMap<String, String> = std::env::vars().collect();
    if let Some(plan) = layers.plan {
        merged.extend(plan.env.clone());
    }
    if let Some(suite) = layers.suite {
        merged.extend(suite.env.clone());
    }
    merged.extend(layers.request_overrides.clone());

    if let Some(existing) = merged.get(PSMODULEPATH).cloned() {
        merged.insert(PSMODULEPATH.to_string(), prepend_path(&predefined.modules_root.display().to_string(), &existing));
    } else {
        merged.insert(PSMODULEPATH.to_string(), predefined.modules_root.display().to_string());
    }

    for (name, value) in predefined_variables(predefined) {
        merged.insert(name, value);
    }

    merged.into_iter().map(|(name, value)| (name, Secret::plain(value))).collect()
}

/// Prepends `prefix` to an existing path-list value using the platform's
/// path separator.
fn prepend_path(prefix: &str, existing: &str) -> String {
    if existing.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}{sep}{existing}", sep = path_list_separator())
    }
}

/// Returns the platform path-list separator (`;` on Windows, `:`
/// elsewhere), matching `PSModulePath`'s own convention.
const fn path_list_separator() -> char {
    if cfg!(windows) { ';' } else { ':' }
}

/// Builds the predefined `PVTX_*` variable set for one case run.
fn predefined_variables(ctx: &PredefinedContext<'_>) -> Vec<(String, String)> {
    vec![
        ("PVTX_TESTCASE_PATH".to_string(), ctx.test_case_path.display().to_string()),
        ("PVTX_TESTCASE_NAME".to_string(), ctx.test_case_identity.id().to_string()),
        ("PVTX_TESTCASE_ID".to_string(), ctx.test_case_identity.id().to_string()),
        ("PVTX_TESTCASE_VER".to_string(), ctx.test_case_identity.version().to_string()),
        ("PVTX_ASSETS_ROOT".to_string(), ctx.assets_root.display().to_string()),
        ("PVTX_MODULES_ROOT".to_string(), ctx.modules_root.display().to_string()),
        ("PVTX_RUN_ID".to_string(), ctx.run_id.to_string()),
        ("PVTX_PHASE".to_string(), ctx.phase.to_string()),
        ("PVTX_CONTROL_DIR".to_string(), ctx.control_dir.display().to_string()),
    ]
}
