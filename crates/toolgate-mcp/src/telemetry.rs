// crates/toolgate-mcp/src/telemetry.rs
// ============================================================================
// Module: MCP Telemetry Labels
// Description: Stable method and outcome labels for audit events.
// Purpose: Classify requests without logging their payloads.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Labels are low-cardinality: tool names are reported separately and never
//! folded into the method label.

use serde::Serialize;

/// JSON-RPC method classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum McpMethod {
    /// MCP handshake.
    Initialize,
    /// Liveness probe.
    Ping,
    /// Catalogue listing (`tools/list` and legacy spellings).
    ToolsList,
    /// `tools/call` or `CallTool`.
    ToolsCall,
    /// Tool invoked directly by method name.
    ToolDirect,
    /// `notifications/*`.
    Notification,
    /// Invalid or malformed JSON-RPC request.
    Invalid,
}

impl McpMethod {
    /// Returns a stable label for the method.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Ping => "ping",
            Self::ToolsList => "tools_list",
            Self::ToolsCall => "tools_call",
            Self::ToolDirect => "tool_direct",
            Self::Notification => "notification",
            Self::Invalid => "invalid",
        }
    }
}

/// Request outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum McpOutcome {
    /// Successful request.
    Ok,
    /// Protocol error or tool error envelope.
    Error,
}

impl McpOutcome {
    /// Returns a stable label for the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Error => "error",
        }
    }
}
