// crates/pvtx-core/src/error.rs
// ============================================================================
// Module: Engine Errors
// Description: Structured validation errors shared across discovery, input
//              resolution, and the orchestrators.
// Purpose: Let every layer raise the same stable error codes named in the
//          engine specification instead of ad-hoc strings.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`EngineError`] aggregates the validation codes from the error-handling
//! design: each variant carries its structured payload and exposes a stable
//! `code()` string so CLI/UI output and tests can assert on the documented
//! code without coupling to the Rust variant name.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::identity::EntityKind;

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Reason a suite node's `ref` failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum RefInvalidReason {
    /// The normalized/canonical path escapes the cases root.
    OutOfRoot,
    /// The referenced folder does not exist.
    NotFound,
    /// The folder exists but its manifest file is absent.
    MissingManifest,
}

// ============================================================================
// SECTION: Engine Error
// ============================================================================

/// Top-level structured error for engine-layer validation failures.
///
/// # Invariants
/// - `code()` is stable and matches the string named in the engine
///   specification's error-handling design.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Two entities shared an identity within one discovery pass.
    #[error(
        "duplicate identity {id} for {entity_type}: {paths:?}",
        id = id,
        entity_type = entity_type,
        paths = conflict_paths
    )]
    IdentityDuplicate {
        /// Entity kind of the colliding identity.
        entity_type: EntityKind,
        /// Duplicated `id@version` string.
        id: String,
        /// Paths of every manifest that declared this identity.
        conflict_paths: Vec<String>,
    },
    /// A suite node's `ref` failed to resolve under the cases root.
    #[error("suite test-case ref invalid ({reason:?}): {case_ref}")]
    SuiteTestCaseRefInvalid {
        /// The `ref` string as declared in the suite manifest.
        case_ref: String,
        /// Why resolution failed.
        reason: RefInvalidReason,
    },
    /// A plan request carried `nodeOverrides` or `caseInputs`.
    #[error("plan run requests must not carry input overrides")]
    RunRequestPlanInputOverride,
    /// A request referenced a `nodeId` absent from the target suite/plan.
    #[error("unknown node id: {node_id}")]
    RunRequestUnknownNodeId {
        /// The unrecognized node id.
        node_id: String,
    },
    /// An `EnvRef` could not be resolved.
    #[error("failed to resolve env ref ${env_var}: {detail}")]
    EnvRefResolveFailed {
        /// Name of the OS environment variable.
        env_var: String,
        /// Human-readable detail.
        detail: String,
    },
    /// I/O failure against the filesystem.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path the operation was attempted against.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A manifest failed to parse as JSON or failed schema validation.
    #[error("invalid manifest at {path}: {detail}")]
    InvalidManifest {
        /// Path to the offending manifest file.
        path: String,
        /// Human-readable detail.
        detail: String,
    },
}

impl EngineError {
    /// Returns the stable validation code string named in the engine
    /// specification.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IdentityDuplicate { .. } => "Identity.Duplicate",
            Self::SuiteTestCaseRefInvalid { .. } => "Suite.TestCaseRef.Invalid",
            Self::RunRequestPlanInputOverride => "RunRequest.Plan.InputOverride",
            Self::RunRequestUnknownNodeId { .. } => "RunRequest.UnknownNodeId",
            Self::EnvRefResolveFailed { .. } => "EnvRef.ResolveFailed",
            Self::Io { .. } => "Io.Failure",
            Self::InvalidManifest { .. } => "Manifest.Invalid",
        }
    }
}
