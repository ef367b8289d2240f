// crates/pvtx-discovery/src/walk.rs
// ============================================================================
// Module: Root Walker
// Description: Recursively finds and parses manifest files under a
//              resolved root.
// Purpose: Give the identity index one place that turns a filesystem tree
//          into `(path, manifest)` pairs, independent of entity kind.
// Dependencies: pvtx-core, serde_json, std::fs
// ============================================================================

//! ## Overview
//! Discovery is read-only and idempotent: walking the same root twice with
//! an unchanged tree produces the same set of entries in the same order.
//! Entries are returned sorted by path so downstream identity-collision
//! errors are deterministic across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use pvtx_core::EngineError;
use serde::de::DeserializeOwned;

// ============================================================================
// SECTION: Directory Walk
// ============================================================================

/// Recursively finds every file named `manifest_file_name` under `root`,
/// returning their paths in sorted order.
///
/// # Errors
///
/// Returns [`EngineError::Io`] if a directory cannot be read.
pub fn find_manifest_paths(root: &Path, manifest_file_name: &str) -> Result<Vec<PathBuf>, EngineError> {
    let mut found = Vec::new();
    if root.is_dir() {
        walk_dir(root, manifest_file_name, &mut found)?;
    }
    found.sort();
    Ok(found)
}

/// Recursion step of [`find_manifest_paths`].
fn walk_dir(dir: &Path, manifest_file_name: &str, found: &mut Vec<PathBuf>) -> Result<(), EngineError> {
    let entries = fs::read_dir(dir).map_err(|source| EngineError::Io {
        path: dir.display().to_string(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| EngineError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            walk_dir(&path, manifest_file_name, found)?;
        } else if path.file_name().and_then(|name| name.to_str()) == Some(manifest_file_name) {
            found.push(path);
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Manifest Parsing
// ============================================================================

/// Parses every manifest file named `manifest_file_name` under `root` as
/// `M`, returning `(path, manifest)` pairs sorted by path.
///
/// # Errors
///
/// Returns [`EngineError::Io`] on a read failure, or
/// [`EngineError::InvalidManifest`] when a file fails to parse as JSON or
/// does not match the expected shape.
pub fn walk_manifests<M: DeserializeOwned>(
    root: &Path,
    manifest_file_name: &str,
) -> Result<Vec<(PathBuf, M)>, EngineError> {
    let paths = find_manifest_paths(root, manifest_file_name)?;
    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = fs::read_to_string(&path).map_err(|source| EngineError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let manifest: M = serde_json::from_str(&raw).map_err(|err| EngineError::InvalidManifest {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        out.push((path, manifest));
    }
    Ok(out)
}
