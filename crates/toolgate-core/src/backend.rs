// crates/toolgate-core/src/backend.rs
// ============================================================================
// Module: Backend Contract
// Description: Trait implemented by each backing service adapter.
// Purpose: Separate session establishment from per-tool execution.
// Dependencies: async-trait, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Backend`] owns a fixed tool catalogue and knows how to (1) establish a
//! client from init arguments and (2) run one tool against that client. The
//! dispatcher owns readiness, validation, and timeouts; backends only see
//! calls that already passed those gates.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::envelope::ToolOutput;
use crate::tooling::GatewayTool;
use crate::tooling::ToolDescriptor;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Backend failures, classified by cause.
///
/// The message is shown to callers verbatim; classification is kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Credentials missing, invalid, or denied.
    #[error("{0}")]
    Auth(String),
    /// Requested resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Caller-supplied input rejected.
    #[error("{0}")]
    Validation(String),
    /// Transport-level failure reaching the service.
    #[error("{0}")]
    Network(String),
    /// Service returned an application error.
    #[error("{0}")]
    Api(String),
    /// Unexpected local failure.
    #[error("{0}")]
    Internal(String),
}

impl BackendError {
    /// Returns a stable label for audit and telemetry.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth(_) => "auth",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Network(_) => "network",
            Self::Api(_) => "api",
            Self::Internal(_) => "internal",
        }
    }

    /// Prefixes the message with operation context, keeping the class.
    #[must_use]
    pub fn with_context(self, context: &str) -> Self {
        let wrap = |message: String| format!("{context}: {message}");
        match self {
            Self::Auth(message) => Self::Auth(wrap(message)),
            Self::NotFound(message) => Self::NotFound(wrap(message)),
            Self::Validation(message) => Self::Validation(wrap(message)),
            Self::Network(message) => Self::Network(wrap(message)),
            Self::Api(message) => Self::Api(wrap(message)),
            Self::Internal(message) => Self::Internal(wrap(message)),
        }
    }
}

// ============================================================================
// SECTION: Contract
// ============================================================================

/// Result of a successful init call.
#[derive(Debug)]
pub struct Connected<C> {
    /// Ready client to install into the session.
    pub client: C,
    /// Redacted summary returned to the caller.
    pub summary: ToolOutput,
}

/// Backing service adapter.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Typed tool identifier.
    type Tool: GatewayTool;
    /// Client installed into the session after init.
    type Client: Send + Sync + 'static;

    /// Display name used in readiness and init messages.
    fn service_name(&self) -> &'static str;

    /// Returns the tool catalogue in advertised order.
    fn descriptors(&self) -> Vec<ToolDescriptor>;

    /// Builds and verifies a client from init arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when credentials are missing or the
    /// verification round-trip fails.
    async fn connect(&self, arguments: Value) -> Result<Connected<Self::Client>, BackendError>;

    /// Executes one non-init tool against a ready client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the service call fails.
    async fn call(
        &self,
        tool: Self::Tool,
        client: &Self::Client,
        arguments: Value,
    ) -> Result<ToolOutput, BackendError>;
}

/// Decodes tool arguments into a typed request.
///
/// # Errors
///
/// Returns [`BackendError::Validation`] when the payload does not match `T`.
pub fn decode_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, BackendError> {
    serde_json::from_value(arguments)
        .map_err(|err| BackendError::Validation(format!("invalid parameters: {err}")))
}
