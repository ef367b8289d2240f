// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Fixtures
// Description: Tempdir-rooted `Roots` plus manifest/script writers and an
//              `Engine` builder shared by every scenario test binary.
// Purpose: Let each scenario file describe only the manifests and scripts
//          that make it distinctive, instead of re-deriving the fixture
//          layout discovery and the runner expect.
// Dependencies: pvtx-config, pvtx-core, pvtx-engine, serde_json, tempfile,
//               tokio
// ============================================================================

//! ## Overview
//! Every scenario drives a real [`Engine`] over a tempdir: no manifest or
//! run-folder shape here is special-cased for a test, it is the same
//! `test.manifest.json` / `suite.manifest.json` / `plan.manifest.json` /
//! run-folder layout `pvtx-discovery` and `pvtx-runfolder` already expect.
//! Each case directory holds its manifest and the script
//! `script.entryPoint` names, side by side, per the resolver's lookup of a
//! case's source directory as its manifest's parent. The script is
//! interpreted by the fixture `pwsh` built from `src/bin/pwsh.rs`, not a
//! real PowerShell Core install; see [`pwsh_path_override`].

#![allow(dead_code, reason = "each scenario binary uses a different subset of these helpers")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::OnceLock;

use pvtx_config::EngineLimits;
use pvtx_config::PlatformAdapter;
use pvtx_config::Roots;
use pvtx_engine::Engine;
use pvtx_engine::reporter::ChannelReporter;
use pvtx_engine::reporter::ReporterEvent;
use serde_json::Value;
use system_tests::config::SystemTestConfig;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

// ============================================================================
// SECTION: Layout
// ============================================================================

/// A fresh, empty set of the five engine roots, rooted either under a
/// managed tempdir or under [`SystemTestEnv::RunRoot`](system_tests::config::SystemTestEnv::RunRoot)
/// when an operator set it to inspect run folders after the fact. The
/// `TempDir`, when present, must outlive every `Engine`/assertion built
/// over `roots`; it is removed from disk when dropped.
pub struct Layout {
    /// Backing tempdir; `None` when rooted under an operator-supplied
    /// directory that this fixture must not delete.
    pub dir: Option<TempDir>,
    /// The five roots, already created on disk.
    pub roots: Roots,
}

/// Builds a fresh [`Layout`] with every root directory already created,
/// rooted under [`SystemTestConfig::run_root`] when set, else a fresh
/// tempdir.
#[allow(clippy::expect_used, reason = "fixture setup failure should fail the test loudly")]
pub fn layout() -> Layout {
    let config = SystemTestConfig::load().expect("system test env config is well-formed");
    let (dir, base) = match config.run_root {
        Some(run_root) => {
            std::fs::create_dir_all(&run_root).expect("mkdir configured run root");
            (None, run_root)
        }
        None => {
            let dir = tempfile::tempdir().expect("tempdir");
            let base = dir.path().to_path_buf();
            (Some(dir), base)
        }
    };
    let roots = Roots {
        cases_root: base.join("cases"),
        suites_root: base.join("suites"),
        plans_root: base.join("plans"),
        runs_root: base.join("runs"),
        assets_root: base.join("assets"),
    };
    for root in [&roots.cases_root, &roots.suites_root, &roots.plans_root, &roots.runs_root, &roots.assets_root] {
        std::fs::create_dir_all(root).expect("mkdir root");
    }
    Layout { dir, roots }
}

// ============================================================================
// SECTION: Manifest / Script Writers
// ============================================================================

/// Writes a test-case manifest (as `manifest`, serialized verbatim) plus its
/// script entry point `script` into a fresh directory `casesRoot/dir_name/`.
/// `manifest`'s `script.entryPoint` must name the same file `script` is
/// written to.
#[allow(clippy::expect_used, reason = "fixture setup failure should fail the test loudly")]
pub fn write_case(roots: &Roots, dir_name: &str, entry_point: &str, manifest: &Value, script: &str) {
    let case_dir = roots.cases_root.join(dir_name);
    std::fs::create_dir_all(&case_dir).expect("mkdir case dir");
    std::fs::write(case_dir.join("test.manifest.json"), serde_json::to_vec_pretty(manifest).expect("serialize case manifest")).expect("write case manifest");
    std::fs::write(case_dir.join(entry_point), script).expect("write case script");
}

/// Writes a test-suite manifest into a fresh directory
/// `suitesRoot/dir_name/`.
#[allow(clippy::expect_used, reason = "fixture setup failure should fail the test loudly")]
pub fn write_suite(roots: &Roots, dir_name: &str, manifest: &Value) {
    let suite_dir = roots.suites_root.join(dir_name);
    std::fs::create_dir_all(&suite_dir).expect("mkdir suite dir");
    std::fs::write(suite_dir.join("suite.manifest.json"), serde_json::to_vec_pretty(manifest).expect("serialize suite manifest")).expect("write suite manifest");
}

/// Writes a test-plan manifest into a fresh directory `plansRoot/dir_name/`.
#[allow(clippy::expect_used, reason = "fixture setup failure should fail the test loudly")]
pub fn write_plan(roots: &Roots, dir_name: &str, manifest: &Value) {
    let plan_dir = roots.plans_root.join(dir_name);
    std::fs::create_dir_all(&plan_dir).expect("mkdir plan dir");
    std::fs::write(plan_dir.join("plan.manifest.json"), serde_json::to_vec_pretty(manifest).expect("serialize plan manifest")).expect("write plan manifest");
}

// ============================================================================
// SECTION: Fixture Interpreter
// ============================================================================

/// A `PATH` value putting the fixture `pwsh` binary (built from
/// `src/bin/pwsh.rs`) first, so a suite's `environment.env.PATH` resolves
/// the engine's bare `pwsh` program name to the fixture interpreter
/// instead of requiring a real PowerShell Core install wherever these
/// tests run.
///
/// `spawn` rebuilds a case's entire child environment from
/// `CaseLaunchSpec.env` via `Command::env_clear()`, so mutating this test
/// process's own `PATH` has no effect on which `pwsh` a launched script
/// resolves to; the override has to travel through a manifest's
/// `environment.env` like any other case environment value. It belongs on
/// the suite manifest rather than a request's `environmentOverrides`
/// because `Engine::resume` always re-runs with an empty
/// `environmentOverrides`, while the suite manifest's own environment is
/// reloaded from disk on every resume.
#[allow(clippy::expect_used, reason = "a missing CARGO_BIN_EXE_pwsh means the fixture binary failed to build, which should fail the test loudly")]
pub fn pwsh_path_override() -> String {
    let pwsh_path = PathBuf::from(env!("CARGO_BIN_EXE_pwsh"));
    let pwsh_dir = pwsh_path.parent().expect("CARGO_BIN_EXE_pwsh has a parent directory").display().to_string();
    format!("{pwsh_dir}:/usr/bin:/bin")
}

// ============================================================================
// SECTION: Engine Construction
// ============================================================================

/// Builds an [`Engine`] over `roots` with `platform` as its platform
/// adapter and [`EngineLimits`] honoring
/// [`SystemTestEnv::TimeoutSeconds`](system_tests::config::SystemTestEnv::TimeoutSeconds)
/// in place of the default per-case timeout floor, when set.
#[allow(clippy::expect_used, reason = "fixture setup failure should fail the test loudly")]
pub fn build_engine(roots: Roots, platform: Box<dyn PlatformAdapter>) -> Engine {
    let config = SystemTestConfig::load().expect("system test env config is well-formed");
    let mut limits = EngineLimits::default();
    if let Some(timeout) = config.timeout {
        limits.default_timeout_sec = timeout.as_secs();
    }
    Engine::new(roots, limits, platform).expect("engine builds")
}

// ============================================================================
// SECTION: Reporter Capture
// ============================================================================

/// Builds a [`ChannelReporter`] paired with the receiving half of its
/// channel, for scenarios that assert an exact lifecycle-event sequence.
pub fn channel_reporter() -> (ChannelReporter, UnboundedReceiver<ReporterEvent>) {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    (ChannelReporter::new(tx), rx)
}

/// Drains every currently-queued event off `rx` without blocking.
pub fn drain(rx: &mut UnboundedReceiver<ReporterEvent>) -> Vec<ReporterEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

// ============================================================================
// SECTION: Environment Mutation
// ============================================================================

/// Wraps the two unsafe env-mutation calls a guarded override needs, mirroring
/// the pattern `system-tests/src/config/env_tests.rs` already uses for the
/// library crate's own unit tests.
mod env_mut {
    #![allow(unsafe_code, reason = "Tests mutate process env vars in a controlled scope guarded by env_lock.")]

    /// Sets `key` to `value` in the current process environment.
    pub fn set_var(key: &str, value: &str) {
        // SAFETY: Callers serialize environment mutation via `super::env_lock`.
        unsafe { std::env::set_var(key, value) }
    }

    /// Removes `key` from the current process environment.
    pub fn remove_var(key: &str) {
        // SAFETY: Callers serialize environment mutation via `super::env_lock`.
        unsafe { std::env::remove_var(key) }
    }
}

/// Returns the process-wide lock serializing env-var mutation across
/// scenarios, since `std::env::set_var` is process-global state and tests in
/// the same binary can run on multiple threads.
#[allow(clippy::expect_used, reason = "a poisoned lock means a prior test panicked mid-mutation; surfacing that loudly is correct")]
pub fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(())).lock().expect("env lock poisoned")
}

/// Sets a batch of environment variables for the guard's lifetime, restoring
/// each one's prior value (or absence) on drop.
pub struct EnvGuard {
    /// Prior `(name, value)` state captured before this guard set anything.
    entries: Vec<(&'static str, Option<String>)>,
}

impl EnvGuard {
    /// Captures the current value of every name in `vars`, then sets each to
    /// its paired value.
    pub fn set(vars: &[(&'static str, &str)]) -> Self {
        let entries = vars.iter().map(|(name, _)| (*name, std::env::var(*name).ok())).collect();
        for (name, value) in vars {
            env_mut::set_var(name, value);
        }
        Self { entries }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.entries.drain(..) {
            match value {
                Some(value) => env_mut::set_var(name, &value),
                None => env_mut::remove_var(name),
            }
        }
    }
}
