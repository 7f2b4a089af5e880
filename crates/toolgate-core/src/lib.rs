// crates/toolgate-core/src/lib.rs
// ============================================================================
// Module: Toolgate Core
// Description: Transport-agnostic tool gateway primitives.
// Purpose: Registry, session, dispatch, and response normalization for tool calls.
// Dependencies: async-trait, jsonschema, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! `toolgate-core` implements the tool-gateway pattern shared by every backend:
//! a static tool catalogue, a lazily-initialized backing client, a dispatcher
//! that routes `(tool, arguments)` pairs to exactly one handler, and a
//! normalizer that folds every outcome into one [`ResponseEnvelope`] shape.
//!
//! ## Invariants
//! - No tool other than the init tool executes before the session is ready.
//! - [`Dispatcher`] never returns a raw error; every call yields an envelope.
//! - The tool catalogue is fixed at construction and never mutated.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backend;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod normalizer;
pub mod registry;
pub mod session;
pub mod tooling;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backend::Backend;
pub use backend::BackendError;
pub use backend::Connected;
pub use backend::decode_arguments;
pub use dispatcher::DEFAULT_CALL_TIMEOUT;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherConfig;
pub use dispatcher::ToolGateway;
pub use envelope::ContentBlock;
pub use envelope::ResponseEnvelope;
pub use envelope::ToolOutput;
pub use error::GatewayError;
pub use registry::RegistryError;
pub use registry::ToolRegistry;
pub use session::Session;
pub use tooling::GatewayTool;
pub use tooling::ToolDescriptor;
