// crates/toolgate-providers/src/lib.rs
// ============================================================================
// Module: Toolgate Providers
// Description: Backend adapters for Linear, AWS Secrets Manager, and docs.
// Purpose: Implement the gateway backend contract for each backing service.
// Dependencies: toolgate-core, reqwest, aws-sdk-secretsmanager
// ============================================================================

//! ## Overview
//! Each module exposes a typed tool enum, a plain-data config section, and a
//! [`toolgate_core::Backend`] implementation. Backends never hold credentials
//! outside the client installed into the session.
//!
//! Security posture: tool arguments and upstream responses are untrusted.
//! Credential material never appears in summaries or error messages.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod docs;
pub mod linear;
pub mod secrets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use docs::DocsBackend;
pub use docs::DocsConfig;
pub use docs::DocsTool;
pub use linear::LinearBackend;
pub use linear::LinearConfig;
pub use linear::LinearTool;
pub use secrets::AwsSecretsConnector;
pub use secrets::SecretsApi;
pub use secrets::SecretsBackend;
pub use secrets::SecretsConnector;
pub use secrets::SecretsManagerConfig;
pub use secrets::SecretsTool;
