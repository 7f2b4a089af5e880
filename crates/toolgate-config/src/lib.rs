// crates/toolgate-config/src/lib.rs
// ============================================================================
// Module: Toolgate Config Library
// Description: Canonical configuration model and validation.
// Purpose: Single source of truth for toolgate.toml semantics.
// Dependencies: serde, toml, toolgate-providers
// ============================================================================

//! ## Overview
//! `toolgate-config` loads `toolgate.toml`, applies defaults, and validates
//! every section before any transport or backend is built.
//!
//! Security posture: config inputs are untrusted and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
