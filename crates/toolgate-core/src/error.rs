// crates/toolgate-core/src/error.rs
// ============================================================================
// Module: Gateway Errors
// Description: Error taxonomy for tool dispatch.
// Purpose: Give every dispatch failure a stable, human-readable message.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`GatewayError`] is the only error type the dispatcher produces. Its
//! `Display` output is the text placed in an error envelope (after the
//! `"Error: "` prefix), so messages are written for the caller, not for logs.

use thiserror::Error;

/// Tool dispatch failures.
///
/// # Invariants
/// - `Display` output is stable and never contains credential material.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Tool name is not part of the catalogue.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    /// A non-init tool was called before the session became ready.
    #[error("{service} not initialized; call init first")]
    NotInitialized {
        /// Backing service display name.
        service: &'static str,
    },
    /// Arguments failed schema validation.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    /// The init tool could not establish a session.
    #[error("Failed to initialize {service}: {message}")]
    InitFailed {
        /// Backing service display name.
        service: &'static str,
        /// Underlying failure message.
        message: String,
    },
    /// The tool handler reported a failure.
    #[error("{0}")]
    Handler(String),
    /// The tool handler exceeded the call timeout.
    #[error("{tool} timed out after {timeout_ms}ms")]
    Timeout {
        /// Tool name.
        tool: String,
        /// Timeout that elapsed, in milliseconds.
        timeout_ms: u64,
    },
    /// The tool result could not be rendered to text.
    #[error("Failed to serialize tool result: {0}")]
    Serialization(String),
}

impl GatewayError {
    /// Returns a stable label for audit and telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::NotInitialized {
                ..
            } => "not_initialized",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::InitFailed {
                ..
            } => "init_failed",
            Self::Handler(_) => "handler",
            Self::Timeout {
                ..
            } => "timeout",
            Self::Serialization(_) => "serialization",
        }
    }
}
