// crates/pvtx-engine/src/inputs.rs
// ============================================================================
// Module: Input Resolver
// Description: Resolves a test case's declared parameters against a
//              request/suite-node override, a manifest default, or an
//              `EnvRef`, then validates the result against the declared
//              type.
// Purpose: Give every orchestrator level one function that turns
//          `{name: literal-or-$env}` pairs plus a manifest's `ParamDef`s
//          into the exact `effectiveInputs` a case run folder snapshots.
// Dependencies: pvtx-core
// ============================================================================

//! ## Overview
//! Resolution for one parameter follows a fixed precedence: an explicit
//! override (a suite node's `inputs`, a request's `nodeOverrides`/
//! `caseInputs`) beats the manifest's own `default`; a value shaped like
//! `{"$env": "VAR", ...}` is resolved against the OS environment instead of
//! being treated as a literal. Every resolved value is wrapped in
//! [`pvtx_core::Secret`] so a value sourced from a `secret: true` `EnvRef`
//! carries its redaction flag all the way to `params.json`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use pvtx_core::EnvRef;
use pvtx_core::ParamDef;
use pvtx_core::ParamType;
use pvtx_core::Secret;
use pvtx_core::TestCaseManifest;
use serde_json::Value;

// ============================================================================
// SECTION: Resolution Error
// ============================================================================

/// Failure resolving or validating a test case's effective inputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    /// An override named a parameter the case manifest does not declare.
    #[error("unknown parameter {name:?}")]
    UnknownParameter {
        /// The offending parameter name.
        name: String,
    },
    /// A required parameter had no override, no `EnvRef` value, and no
    /// manifest default.
    #[error("required parameter {name:?} has no value")]
    MissingRequired {
        /// The unsatisfied parameter name.
        name: String,
    },
    /// A value did not match its declared [`ParamType`].
    #[error("parameter {name:?} does not match declared type")]
    TypeMismatch {
        /// The offending parameter name.
        name: String,
    },
    /// An `Enum`-typed value was not one of the declared `enumValues`.
    #[error("parameter {name:?} value {value:?} is not a declared enum value")]
    EnumMismatch {
        /// The offending parameter name.
        name: String,
        /// The value that failed membership.
        value: String,
    },
    /// A numeric value fell outside the declared `min`/`max` bounds.
    #[error("parameter {name:?} value {value} is outside its declared bounds")]
    OutOfBounds {
        /// The offending parameter name.
        name: String,
        /// The out-of-bounds value.
        value: f64,
    },
    /// An `EnvRef` pointed at an empty environment variable with
    /// `required: true` and no `default`.
    #[error("env ref ${env_var} is required but empty and has no default")]
    EnvRefResolveFailed {
        /// Name of the environment variable that could not be resolved.
        env_var: String,
    },
    /// A `File`/`Folder` parameter's resolved path did not exist at
    /// pre-node validation time.
    #[error("parameter {name:?} path {path:?} does not exist")]
    PathNotFound {
        /// The offending parameter name.
        name: String,
        /// The path that was checked.
        path: String,
    },
}

impl InputError {
    /// Returns a stable code string for this failure, reusing the engine
    /// specification's `EnvRef.ResolveFailed` code where it applies and a
    /// local `Input.Invalid` code for every other static-validation
    /// failure not individually named there.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EnvRefResolveFailed { .. } => "EnvRef.ResolveFailed",
            _ => "Input.Invalid",
        }
    }
}

// ============================================================================
// SECTION: Resolved Inputs
// ============================================================================

/// The effective inputs for one case run, plus the bookkeeping the runner
/// and reporter need downstream.
#[derive(Debug, Clone, Default)]
pub struct ResolvedInputs {
    /// Final `{name: value}` map, ready for [`pvtx_runner::build_argv`] and
    /// the `params.json` snapshot.
    pub effective_inputs: BTreeMap<String, Secret<Value>>,
    /// Literal secret values to scrub from streamed stdout/stderr.
    pub secret_needles: Vec<String>,
    /// True when at least one resolved input came from a `secret: true`
    /// `EnvRef`, meaning it will still appear on the script's command line
    /// since the runner always passes parameters as named arguments.
    pub carried_secret_on_command_line: bool,
}

// ============================================================================
// SECTION: Resolution
// ============================================================================

/// Resolves every declared parameter of `manifest` against `overrides`
/// (already merged: a suite node's `inputs` overridden by a request's
/// `nodeOverrides`/`caseInputs`, highest priority last).
///
/// # Errors
///
/// Returns the first [`InputError`] encountered: an override naming an
/// undeclared parameter, a required parameter left unsatisfied, a value
/// failing its declared type/bounds/enum membership, or an `EnvRef` that
/// cannot be resolved.
pub fn resolve_inputs(manifest: &TestCaseManifest, overrides: &BTreeMap<String, Value>) -> Result<ResolvedInputs, InputError> {
    reject_unknown_names(manifest, overrides)?;

    let mut resolved = ResolvedInputs::default();
    for param in &manifest.parameters {
        let Some(raw) = overrides.get(&param.name).cloned().or_else(|| param.default.clone()) else {
            if param.required {
                return Err(InputError::MissingRequired { name: param.name.clone() });
            }
            continue;
        };

        let value = resolve_one(param, raw, &mut resolved)?;
        validate_value(param, &value)?;
        resolved.effective_inputs.insert(param.name.clone(), value);
    }
    Ok(resolved)
}

/// Rejects any override key that does not name a declared parameter.
fn reject_unknown_names(manifest: &TestCaseManifest, overrides: &BTreeMap<String, Value>) -> Result<(), InputError> {
    for name in overrides.keys() {
        if manifest.parameter(name).is_none() {
            return Err(InputError::UnknownParameter { name: name.clone() });
        }
    }
    Ok(())
}

/// Resolves one parameter's raw value, following the `EnvRef` substitution
/// rule when the value is shaped like one.
fn resolve_one(param: &ParamDef, raw: Value, resolved: &mut ResolvedInputs) -> Result<Secret<Value>, InputError> {
    match serde_json::from_value::<EnvRef>(raw.clone()) {
        Ok(env_ref) => resolve_env_ref(param, &env_ref, resolved),
        Err(_unused) => Ok(Secret::plain(raw)),
    }
}

/// Resolves an `EnvRef` value source against the OS environment.
fn resolve_env_ref(param: &ParamDef, env_ref: &EnvRef, resolved: &mut ResolvedInputs) -> Result<Secret<Value>, InputError> {
    let from_env = env::var(&env_ref.env).ok().filter(|value| !value.is_empty());
    let literal = match from_env.or_else(|| env_ref.default.clone()) {
        Some(value) => value,
        None if env_ref.required => {
            return Err(InputError::EnvRefResolveFailed { env_var: env_ref.env.clone() });
        }
        None => return Ok(Secret::new(Value::Null, env_ref.secret)),
    };
    if env_ref.secret {
        resolved.secret_needles.push(literal.clone());
        resolved.carried_secret_on_command_line = true;
    }
    let _ = param;
    Ok(Secret::new(Value::String(literal), env_ref.secret))
}

/// Validates a resolved value against its declared type, bounds, and enum
/// membership.
fn validate_value(param: &ParamDef, value: &Secret<Value>) -> Result<(), InputError> {
    let literal = value.expose_for_exec();
    if literal.is_null() {
        return Ok(());
    }
    match param.param_type {
        ParamType::Boolean => require(literal.is_boolean(), param),
        ParamType::Int | ParamType::Double => validate_numeric(param, literal),
        ParamType::Enum => validate_enum(param, literal),
        ParamType::String | ParamType::Path | ParamType::File | ParamType::Folder => require(literal.is_string(), param),
        ParamType::Json => Ok(()),
    }
}

/// Returns `TypeMismatch` for `param` unless `condition` holds.
fn require(condition: bool, param: &ParamDef) -> Result<(), InputError> {
    if condition {
        Ok(())
    } else {
        Err(InputError::TypeMismatch { name: param.name.clone() })
    }
}

/// Validates a numeric value's type and `min`/`max` bounds.
fn validate_numeric(param: &ParamDef, literal: &Value) -> Result<(), InputError> {
    let number = literal.as_f64().ok_or_else(|| InputError::TypeMismatch { name: param.name.clone() })?;
    if param.min.is_some_and(|min| number < min) || param.max.is_some_and(|max| number > max) {
        return Err(InputError::OutOfBounds { name: param.name.clone(), value: number });
    }
    Ok(())
}

/// Validates an `Enum`-typed value is one of the declared `enumValues`.
fn validate_enum(param: &ParamDef, literal: &Value) -> Result<(), InputError> {
    let text = literal.as_str().ok_or_else(|| InputError::TypeMismatch { name: param.name.clone() })?;
    if param.enum_values.iter().any(|candidate| candidate == text) {
        Ok(())
    } else {
        Err(InputError::EnumMismatch { name: param.name.clone(), value: text.to_string() })
    }
}

// ============================================================================
// SECTION: Pre-Node Validation
// ============================================================================

/// Checks that every resolved `File`/`Folder` parameter exists under
/// `case_dir`, the only point at which the input resolver touches the
/// filesystem.
///
/// # Errors
///
/// Returns [`InputError::PathNotFound`] for the first missing path.
pub fn validate_paths_exist(case_dir: &Path, manifest: &TestCaseManifest, resolved: &ResolvedInputs) -> Result<(), InputError> {
    for param in &manifest.parameters {
        if !matches!(param.param_type, ParamType::File | ParamType::Folder) {
            continue;
        }
        let Some(value) = resolved.effective_inputs.get(&param.name) else { continue };
        let Some(text) = value.expose_for_exec().as_str() else { continue };
        let candidate = case_dir.join(text);
        let exists = match param.param_type {
            ParamType::File => candidate.is_file(),
            ParamType::Folder => candidate.is_dir(),
            _ => true,
        };
        if !exists {
            return Err(InputError::PathNotFound { name: param.name.clone(), path: text.to_string() });
        }
    }
    Ok(())
}
