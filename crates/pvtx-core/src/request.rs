// crates/pvtx-core/src/request.rs
// ============================================================================
// Module: Run Request
// Description: The `RunRequest` shape accepted from the CLI/UI, selecting
//              exactly one of a suite, plan or standalone test-case run.
// Purpose: Give discovery/engine a single validated request type instead of
//          three ad-hoc argument lists.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A [`RunRequest`] names exactly one [`RunTarget`] plus the overrides that
//! target kind is allowed to carry. Plan requests may never carry input
//! overrides (`RunRequest.Plan.InputOverride`); only suite requests carry
//! per-node overrides; only standalone case requests carry `caseInputs`.
//! `environmentOverrides.env` is legal on every variant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Node Overrides
// ============================================================================

/// Input overrides for a single suite node, keyed by the node's declared
/// parameter names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeOverride {
    /// Parameter name to literal-value overrides.
    #[serde(default)]
    pub inputs: BTreeMap<String, Value>,
}

// ============================================================================
// SECTION: Environment Overrides
// ============================================================================

/// Request-level environment override, restricted to `env`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentOverrides {
    /// Plain string environment variables; empty map is valid, empty key is
    /// rejected by the environment resolver.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

// ============================================================================
// SECTION: Run Target
// ============================================================================

/// The single entity a `RunRequest` names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunTarget {
    /// Run a suite by `id@version`.
    Suite {
        /// Suite identity string.
        suite: String,
    },
    /// Run a plan by `id@version`.
    Plan {
        /// Plan identity string.
        plan: String,
    },
    /// Run a single test case by `id@version`, outside any suite/plan.
    TestCase {
        /// Test-case identity string.
        test_case: String,
    },
}

// ============================================================================
// SECTION: Run Request
// ============================================================================

/// A validated request to execute a suite, plan, or standalone test case.
///
/// # Invariants
/// - Plan requests must not carry `node_overrides` or `case_inputs`.
/// - Suite requests may carry `node_overrides`; they must not carry
///   `case_inputs`.
/// - Standalone case requests may carry `case_inputs`; they must not carry
///   `node_overrides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// The single target this request runs.
    pub target: RunTarget,
    /// Per-node input overrides, keyed by `nodeId`. Only legal for suite
    /// requests.
    #[serde(default)]
    pub node_overrides: BTreeMap<String, NodeOverride>,
    /// Input overrides for a standalone case request.
    #[serde(default)]
    pub case_inputs: BTreeMap<String, Value>,
    /// Environment overrides, legal for every request variant.
    #[serde(default)]
    pub environment_overrides: EnvironmentOverrides,
}

/// Error returned by [`RunRequest::validate_shape`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunRequestShapeError {
    /// A plan request carried `nodeOverrides` and/or `caseInputs`.
    #[error("plan requests must not carry nodeOverrides or caseInputs")]
    PlanInputOverride,
    /// A suite request carried `caseInputs`, which is reserved for
    /// standalone case requests.
    #[error("suite requests must not carry caseInputs")]
    SuiteCarriesCaseInputs,
    /// A standalone case request carried `nodeOverrides`, which is reserved
    /// for suite requests.
    #[error("standalone case requests must not carry nodeOverrides")]
    CaseCarriesNodeOverrides,
}

impl RunRequest {
    /// Validates the shape-level invariants for the request's target kind.
    ///
    /// # Errors
    ///
    /// Returns [`RunRequestShapeError`] when overrides are present on a
    /// target kind that forbids them. This does not validate override
    /// *contents* (parameter names, types); that happens in the input
    /// resolver once the target's manifest is known.
    pub fn validate_shape(&self) -> Result<(), RunRequestShapeError> {
        match &self.target {
            RunTarget::Plan { .. } => {
                if !self.node_overrides.is_empty() || !self.case_inputs.is_empty() {
                    return Err(RunRequestShapeError::PlanInputOverride);
                }
            }
            RunTarget::Suite { .. } => {
                if !self.case_inputs.is_empty() {
                    return Err(RunRequestShapeError::SuiteCarriesCaseInputs);
                }
            }
            RunTarget::TestCase { .. } => {
                if !self.node_overrides.is_empty() {
                    return Err(RunRequestShapeError::CaseCarriesNodeOverrides);
                }
            }
        }
        Ok(())
    }
}
