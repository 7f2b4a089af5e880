// crates/toolgate-cli/src/lib.rs
// ============================================================================
// Module: Toolgate CLI Library
// Description: Shared helpers for the toolgate command-line interface.
// Purpose: Keep launch policy testable apart from the binary entry point.
// Dependencies: toolgate-config
// ============================================================================

//! ## Overview
//! The binary entry point (`src/main.rs`) imports the serve policy from here
//! so bind-exposure rules are unit-tested without spawning a process.
//!
//! Security posture: CLI inputs are untrusted and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Bind exposure policy for `toolgate serve`.
pub mod serve_policy;
