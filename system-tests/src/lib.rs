// system-tests/src/lib.rs
// ============================================================================
// Module: PVT-X System Tests Library
// Description: Shared configuration and helpers for system test scenarios.
// Purpose: Provide common utilities for the PVT-X system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the PVT-X system-test
//! binaries in `system-tests/tests`. The fixture-building helpers those
//! binaries share (tempdir roots, manifest writers, an `Engine` builder)
//! live under `tests/helpers` instead, since they depend on
//! `dev-dependencies` this library does not carry.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
