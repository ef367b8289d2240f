// crates/pvtx-config/src/lib.rs
// ============================================================================
// Module: PVT-X Config
// Description: Resolved filesystem roots, engine limits, and the platform
//              adapter abstraction.
// Purpose: Give the CLI, engine and runner one shared configuration model
//          loaded from a TOML file with environment-variable overrides.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! [`PvtxConfig`] is the single configuration entry point: it owns the
//! five resolved [`Roots`] and the tunable [`EngineLimits`]. The
//! [`PlatformAdapter`] trait lives here too since it is configuration in
//! the same sense: which concrete reboot/autostart mechanism backs a given
//! deployment is a wiring decision made once at startup.

pub mod limits;
pub mod load;
pub mod platform;
pub mod roots;

pub use limits::EngineLimits;
pub use load::ConfigError;
pub use load::PvtxConfig;
pub use platform::PlatformAdapter;
pub use platform::PlatformError;
pub use platform::RecordingPlatformAdapter;
pub use platform::ResumeCommand;
pub use roots::Roots;
