// crates/pvtx-core/src/manifest.rs
// ============================================================================
// Module: Manifest Shapes
// Description: Parsed `test.manifest.json` / `suite.manifest.json` /
//              `plan.manifest.json` data.
// Purpose: Give discovery, the input/environment resolvers and the
//          orchestrators one shared, serde-derived manifest vocabulary.
// Dependencies: crate::identity, serde, serde_json
// ============================================================================

//! ## Overview
//! These types mirror the manifest JSON files on disk. Discovery parses them
//! as-is; validation of cross-references (suite node `ref`, plan suite
//! identity) happens in `pvtx-discovery`, not here, so this module stays a
//! pure shape definition.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::identity::Identity;

// ============================================================================
// SECTION: Parameter Definitions
// ============================================================================

/// Parameter value types a test case may declare.
///
/// # Invariants
/// - Arrays are not a distinct type; structured values travel as `Json`
///   strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    /// Signed integer.
    Int,
    /// Double-precision float.
    Double,
    /// UTF-8 string.
    String,
    /// Boolean.
    Boolean,
    /// Filesystem path (existence not required).
    Path,
    /// Filesystem path to a file that must exist at pre-node validation.
    File,
    /// Filesystem path to a folder that must exist at pre-node validation.
    Folder,
    /// One of a declared enum value set.
    Enum,
    /// An arbitrary JSON value, carried as a raw JSON string argument.
    Json,
}

/// A named parameter declared by a test-case manifest.
///
/// # Invariants
/// - `enum_values` is populated iff `param_type == Enum`.
/// - `default` must satisfy `min`/`max`/`pattern`/`enum_values` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDef {
    /// Parameter name, referenced by suite node inputs and CLI overrides.
    pub name: String,
    /// Declared value type.
    #[serde(rename = "type")]
    pub param_type: ParamType,
    /// Minimum numeric value (applies to `Int`/`Double`).
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum numeric value (applies to `Int`/`Double`).
    #[serde(default)]
    pub max: Option<f64>,
    /// Allowed values when `param_type == Enum`.
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Regex pattern applied to string-shaped values.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Default literal value, as JSON.
    #[serde(default)]
    pub default: Option<Value>,
    /// Whether the parameter must be supplied (directly or via default).
    #[serde(default)]
    pub required: bool,
    /// Human-readable help text.
    #[serde(default)]
    pub help: Option<String>,
}

// ============================================================================
// SECTION: EnvRef
// ============================================================================

/// A value source resolved from an OS environment variable at pre-execution
/// time.
///
/// # Invariants
/// - Empty string and absence both count as "empty" when evaluating
///   `required`/`default`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvRef {
    /// Name of the OS environment variable to read.
    #[serde(rename = "$env")]
    pub env: String,
    /// Fallback literal used when the variable is empty.
    #[serde(default)]
    pub default: Option<String>,
    /// Whether resolution must fail if the variable is empty and no default
    /// is supplied.
    #[serde(default)]
    pub required: bool,
    /// Whether the resolved value must be redacted in persisted artifacts.
    #[serde(default)]
    pub secret: bool,
}

// ============================================================================
// SECTION: Privilege
// ============================================================================

/// Required elevation level for a test case, checked upstream of engine
/// entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Privilege {
    /// No elevation required.
    Standard,
    /// Administrator/root elevation required.
    Elevated,
}

// ============================================================================
// SECTION: Script Entry
// ============================================================================

/// Opaque descriptor for the script entry point; the engine never
/// interprets the script language, only the relative path to invoke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptEntry {
    /// Path to the script entry point, relative to the case folder.
    pub entry_point: String,
}

// ============================================================================
// SECTION: Test Case Manifest
// ============================================================================

/// Parsed `test.manifest.json`.
///
/// # Invariants
/// - Must not declare environment blocks; if present, they are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseManifest {
    /// Stable case identifier (not yet combined with version).
    pub id: String,
    /// Manifest-declared version string.
    pub version: String,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<ParamDef>,
    /// Required elevation level.
    #[serde(default = "default_privilege")]
    pub privilege: Privilege,
    /// Per-case timeout in seconds.
    pub timeout_sec: u64,
    /// Script entry descriptor.
    pub script: ScriptEntry,
}

const fn default_privilege() -> Privilege {
    Privilege::Standard
}

impl TestCaseManifest {
    /// Returns the combined `id@version` identity for this manifest.
    ///
    /// # Errors
    ///
    /// Returns [`crate::identity::IdentityError`] when `id`/`version` are
    /// invalid.
    pub fn identity(&self) -> Result<Identity, crate::identity::IdentityError> {
        Identity::new(&self.id, &self.version)
    }

    /// Looks up a declared parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParamDef> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

// ============================================================================
// SECTION: Suite Controls / Environment
// ============================================================================

/// Timeout handling policy for a suite node, carried for contract fidelity;
/// the runner always enforces the per-case `timeout_sec` regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum TimeoutPolicy {
    /// Abort the node's attempt loop when a timeout occurs (default).
    AbortOnTimeout,
    /// Continue to the node's remaining retries on timeout.
    RetryOnTimeout,
}

/// Execution controls for a suite, optionally overridden per plan entry.
///
/// # Invariants
/// - `repeat == 0` is clamped to 1 by the orchestrator (treated as "at
///   least one iteration").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[serde(rename_all = "camelCase")]
pub struct SuiteControls {
    /// Number of times to repeat the full node list.
    pub repeat: u32,
    /// Declared parallelism; values above 1 are downgraded to sequential
    /// execution with a warning event.
    pub max_parallel: u32,
    /// Whether to continue past a non-passed node.
    pub continue_on_failure: bool,
    /// Extra attempts granted to each node on `Error`/`Timeout`.
    pub retry_on_error: u32,
    /// Timeout handling policy.
    pub timeout_policy: TimeoutPolicy,
}

impl Default for SuiteControls {
    fn default() -> Self {
        Self {
            repeat: 1,
            max_parallel: 1,
            continue_on_failure: false,
            retry_on_error: 0,
            timeout_policy: TimeoutPolicy::AbortOnTimeout,
        }
    }
}

impl SuiteControls {
    /// Returns the effective repeat count, clamping zero to one.
    #[must_use]
    pub const fn effective_repeat(self) -> u32 {
        if self.repeat == 0 { 1 } else { self.repeat }
    }

    /// Merges plan-level overrides using "override wins when non-default".
    #[must_use]
    pub fn merge_plan_override(self, plan_override: Self) -> Self {
        let default = Self::default();
        Self {
            repeat: if plan_override.repeat != default.repeat {
                plan_override.repeat
            } else {
                self.repeat
            },
            max_parallel: if plan_override.max_parallel != default.max_parallel {
                plan_override.max_parallel
            } else {
                self.max_parallel
            },
            continue_on_failure: self.continue_on_failure || plan_override.continue_on_failure,
            retry_on_error: if plan_override.retry_on_error != default.retry_on_error {
                plan_override.retry_on_error
            } else {
                self.retry_on_error
            },
            timeout_policy: if plan_override.timeout_policy != default.timeout_policy {
                plan_override.timeout_policy
            } else {
                self.timeout_policy
            },
        }
    }
}

/// Environment configuration declared on a suite manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteEnvironment {
    /// Plain string environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory override for nodes in this suite.
    #[serde(default)]
    pub working_dir: Option<String>,
    /// Free-form hints passed through to the runner/script.
    #[serde(default)]
    pub runner_hints: BTreeMap<String, String>,
}

/// Environment configuration declared on a plan manifest; restricted to
/// `env` only, per the data model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanEnvironment {
    /// Plain string environment variables.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Suite Node
// ============================================================================

/// One entry in a suite's ordered `testCases[]` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteNode {
    /// Node identifier, unique within the suite.
    pub node_id: String,
    /// Folder reference under the cases root.
    #[serde(rename = "ref")]
    pub case_ref: String,
    /// Per-node input overrides, restricted to the referenced case's
    /// parameter names.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Test Suite Manifest
// ============================================================================

/// Parsed `suite.manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSuiteManifest {
    /// Stable suite identifier.
    pub id: String,
    /// Manifest-declared version string.
    pub version: String,
    /// Ordered node list.
    pub test_cases: Vec<SuiteNode>,
    /// Execution controls.
    #[serde(default)]
    pub controls: SuiteControls,
    /// Environment configuration.
    #[serde(default)]
    pub environment: SuiteEnvironment,
}

impl TestSuiteManifest {
    /// Returns the combined `id@version` identity for this manifest.
    ///
    /// # Errors
    ///
    /// Returns [`crate::identity::IdentityError`] when `id`/`version` are
    /// invalid.
    pub fn identity(&self) -> Result<Identity, crate::identity::IdentityError> {
        Identity::new(&self.id, &self.version)
    }
}

// ============================================================================
// SECTION: Plan Suite Entry
// ============================================================================

/// One entry in a plan's ordered `testSuites[]` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSuiteEntry {
    /// Node identifier in `suiteId@version` form.
    pub node_id: String,
    /// Optional human-readable reference.
    #[serde(default)]
    pub ref_hint: Option<String>,
    /// Control overrides for the referenced suite.
    #[serde(default)]
    pub controls: Option<SuiteControls>,
}

// ============================================================================
// SECTION: Test Plan Manifest
// ============================================================================

/// Parsed `plan.manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlanManifest {
    /// Stable plan identifier.
    pub id: String,
    /// Manifest-declared version string.
    pub version: String,
    /// Ordered suite entries.
    pub test_suites: Vec<PlanSuiteEntry>,
    /// Environment configuration, restricted to `env` only.
    #[serde(default)]
    pub environment: PlanEnvironment,
}

impl TestPlanManifest {
    /// Returns the combined `id@version` identity for this manifest.
    ///
    /// # Errors
    ///
    /// Returns [`crate::identity::IdentityError`] when `id`/`version` are
    /// invalid.
    pub fn identity(&self) -> Result<Identity, crate::identity::IdentityError> {
        Identity::new(&self.id, &self.version)
    }
}
