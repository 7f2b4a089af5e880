// crates/toolgate-mcp/src/lib.rs
// ============================================================================
// Module: Toolgate MCP
// Description: MCP transports, JSON-RPC routing, and audit logging.
// Purpose: Serve one configured tool gateway over stdio or HTTP.
// Dependencies: axum, serde, serde_json, tokio, toolgate-config, toolgate-core
// ============================================================================

//! ## Overview
//! This crate binds a [`toolgate_core::ToolGateway`] to a wire protocol.
//! [`McpServer`] is the entry point; [`RpcRouter`] holds the method routing
//! shared by both transports, and [`McpAuditSink`] receives structured
//! request and lifecycle events.
//!
//! Security posture: every inbound byte is untrusted; bodies are bounded
//! before parsing and tool arguments are never written to audit logs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod framing;
pub mod gateway;
pub mod rpc;
pub mod server;
pub mod telemetry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::LifecycleEvent;
pub use audit::LifecycleKind;
pub use audit::McpAuditEvent;
pub use audit::McpAuditSink;
pub use audit::McpFileAuditSink;
pub use audit::McpNoopAuditSink;
pub use audit::McpStderrAuditSink;
pub use gateway::audit_sink;
pub use gateway::build_gateway;
pub use gateway::tool_catalogue;
pub use rpc::JsonRpcResponse;
pub use rpc::RpcOutcome;
pub use rpc::RpcRouter;
pub use server::McpServer;
pub use server::McpServerError;
pub use telemetry::McpMethod;
pub use telemetry::McpOutcome;
