// crates/pvtx-runner/src/argv.rs
// ============================================================================
// Module: Argument Vector Builder
// Description: Builds a script's named-argument vector from its declared
//              parameters and resolved effective inputs.
// Purpose: Give the runner one function that turns `{name: value}` pairs
//          into the exact argv the script expects, with no shell involved.
// Dependencies: pvtx-core
// ============================================================================

//! ## Overview
//! Each declared parameter with a resolved value becomes two argv elements:
//! `-Name` followed by its formatted value. Booleans format as the literal
//! tokens `$true`/`$false`; numbers format in invariant culture (a plain
//! `.` decimal point, no grouping); JSON-typed parameters pass their raw
//! JSON text as a single argv element; everything else passes through as
//! one string. A parameter absent from the effective inputs (an unresolved
//! optional) is omitted entirely. The vector is handed directly to the
//! subprocess launcher; nothing here is shell-escaped because nothing here
//! is ever interpreted by a shell.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use pvtx_core::ParamDef;
use pvtx_core::ParamType;
use pvtx_core::Secret;
use serde_json::Value;

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds the named-argument vector for `params`, using the resolved value
/// in `effective_inputs` for each parameter that has one.
///
/// Parameters are emitted in manifest-declared order; the data model does
/// not assign meaning to argument order.
#[must_use]
pub fn build_argv(params: &[ParamDef], effective_inputs: &BTreeMap<String, Secret<Value>>) -> Vec<String> {
    let mut argv = Vec::new();
    for param in params {
        let Some(secret) = effective_inputs.get(&param.name) else { continue };
        argv.push(format!("-{}", param.name));
        argv.push(format_value(param.param_type, secret.expose_for_exec()));
    }
    argv
}

/// Formats one resolved value per its declared [`ParamType`].
fn format_value(param_type: ParamType, value: &Value) -> String {
    match param_type {
        ParamType::Boolean => {
            if value.as_bool().unwrap_or(false) {
                "$true".to_string()
            } else {
                "$false".to_string()
            }
        }
        ParamType::Json => value.to_string(),
        ParamType::Int | ParamType::Double => value.as_f64().map_or_else(|| value.to_string(), |n| format_invariant_number(n)),
        ParamType::String | ParamType::Path | ParamType::File | ParamType::Folder | ParamType::Enum => {
            value.as_str().map_or_else(|| value.to_string(), str::to_string)
        }
    }
}

/// Formats a number using a plain `.` decimal point and no grouping
/// separators, dropping a trailing `.0` for whole values.
fn format_invariant_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        #[allow(clippy::cast_possible_truncation, reason = "range checked above against i64::MAX via the 1e15 bound")]
        let whole = n as i64;
        whole.to_string()
    } else {
        n.to_string()
    }
}
