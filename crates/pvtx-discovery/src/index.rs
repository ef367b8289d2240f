// crates/pvtx-discovery/src/index.rs
// ============================================================================
// Module: Identity Index
// Description: Per-kind manifest maps keyed by identity, built by walking
//              the three resolved roots.
// Purpose: Enforce the single shared identity namespace across cases,
//          suites and plans and give orchestrators O(log n) manifest
//          lookup by identity.
// Dependencies: pvtx-core, crate::walk
// ============================================================================

//! ## Overview
//! [`DiscoveryIndex::build`] walks `casesRoot`, `suitesRoot` and `plansRoot`,
//! parses every manifest it finds, and inserts each into a per-kind
//! `BTreeMap<Identity, _>`. Every insertion is checked against a single
//! cross-kind identity namespace: a case and a suite declaring the same
//! `id@version` is as much a collision as two cases declaring it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;

use pvtx_core::EngineError;
use pvtx_core::EntityKind;
use pvtx_core::Identity;
use pvtx_core::TestCaseManifest;
use pvtx_core::TestPlanManifest;
use pvtx_core::TestSuiteManifest;

use crate::walk::walk_manifests;

// ============================================================================
// SECTION: Entries
// ============================================================================

/// A discovered test-case manifest plus the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseEntry {
    /// Path to the manifest file on disk.
    pub path: PathBuf,
    /// Parsed manifest.
    pub manifest: TestCaseManifest,
}

/// A discovered test-suite manifest plus the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteEntry {
    /// Path to the manifest file on disk.
    pub path: PathBuf,
    /// Parsed manifest.
    pub manifest: TestSuiteManifest,
}

/// A discovered test-plan manifest plus the path it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanEntry {
    /// Path to the manifest file on disk.
    pub path: PathBuf,
    /// Parsed manifest.
    pub manifest: TestPlanManifest,
}

// ============================================================================
// SECTION: Discovery Index
// ============================================================================

/// The result of one discovery pass over the three resolved roots.
///
/// # Invariants
/// - No [`Identity`] appears in more than one of `cases`, `suites`, `plans`
///   combined; a collision anywhere in that shared namespace fails the
///   whole discovery pass.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryIndex {
    cases: BTreeMap<Identity, CaseEntry>,
    suites: BTreeMap<Identity, SuiteEntry>,
    plans: BTreeMap<Identity, PlanEntry>,
    claimed: BTreeMap<Identity, (EntityKind, PathBuf)>,
}

impl DiscoveryIndex {
    /// Returns an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Walks `cases_root`, `suites_root` and `plans_root`, parsing every
    /// manifest found and inserting it into the index.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] on a read failure,
    /// [`EngineError::InvalidManifest`] when a manifest fails to parse, or
    /// [`EngineError::IdentityDuplicate`] on a cross-kind identity
    /// collision.
    pub fn build(cases_root: &Path, suites_root: &Path, plans_root: &Path) -> Result<Self, EngineError> {
        let mut index = Self::new();

        for (path, manifest) in walk_manifests::<TestCaseManifest>(cases_root, EntityKind::TestCase.manifest_file_name())? {
            index.insert_case(path, manifest)?;
        }
        for (path, manifest) in
            walk_manifests::<TestSuiteManifest>(suites_root, EntityKind::TestSuite.manifest_file_name())?
        {
            index.insert_suite(path, manifest)?;
        }
        for (path, manifest) in walk_manifests::<TestPlanManifest>(plans_root, EntityKind::TestPlan.manifest_file_name())? {
            index.insert_plan(path, manifest)?;
        }

        Ok(index)
    }

    /// Claims `identity` for `kind`/`path`, failing if another entity
    /// already claimed it.
    fn claim(&mut self, identity: &Identity, kind: EntityKind, path: &Path) -> Result<(), EngineError> {
        if let Some((_, existing_path)) = self.claimed.get(identity) {
            return Err(EngineError::IdentityDuplicate {
                entity_type: kind,
                id: identity.to_string(),
                conflict_paths: vec![existing_path.display().to_string(), path.display().to_string()],
            });
        }
        self.claimed.insert(identity.clone(), (kind, path.to_path_buf()));
        Ok(())
    }

    /// Inserts a discovered case manifest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidManifest`] when the identity fields are
    /// malformed, or [`EngineError::IdentityDuplicate`] on collision.
    pub fn insert_case(&mut self, path: PathBuf, manifest: TestCaseManifest) -> Result<(), EngineError> {
        let identity = manifest.identity().map_err(|err| EngineError::InvalidManifest {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        self.claim(&identity, EntityKind::TestCase, &path)?;
        self.cases.insert(identity, CaseEntry { path, manifest });
        Ok(())
    }

    /// Inserts a discovered suite manifest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidManifest`] when the identity fields are
    /// malformed, or [`EngineError::IdentityDuplicate`] on collision.
    pub fn insert_suite(&mut self, path: PathBuf, manifest: TestSuiteManifest) -> Result<(), EngineError> {
        let identity = manifest.identity().map_err(|err| EngineError::InvalidManifest {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        self.claim(&identity, EntityKind::TestSuite, &path)?;
        self.suites.insert(identity, SuiteEntry { path, manifest });
        Ok(())
    }

    /// Inserts a discovered plan manifest.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidManifest`] when the identity fields are
    /// malformed, or [`EngineError::IdentityDuplicate`] on collision.
    pub fn insert_plan(&mut self, path: PathBuf, manifest: TestPlanManifest) -> Result<(), EngineError> {
        let identity = manifest.identity().map_err(|err| EngineError::InvalidManifest {
            path: path.display().to_string(),
            detail: err.to_string(),
        })?;
        self.claim(&identity, EntityKind::TestPlan, &path)?;
        self.plans.insert(identity, PlanEntry { path, manifest });
        Ok(())
    }

    /// Looks up a discovered test case by identity.
    #[must_use]
    pub fn case(&self, identity: &Identity) -> Option<&CaseEntry> {
        self.cases.get(identity)
    }

    /// Looks up a discovered test suite by identity.
    #[must_use]
    pub fn suite(&self, identity: &Identity) -> Option<&SuiteEntry> {
        self.suites.get(identity)
    }

    /// Looks up a discovered test plan by identity.
    #[must_use]
    pub fn plan(&self, identity: &Identity) -> Option<&PlanEntry> {
        self.plans.get(identity)
    }

    /// Returns the number of discovered cases.
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Returns the number of discovered suites.
    #[must_use]
    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    /// Returns the number of discovered plans.
    #[must_use]
    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }
}
