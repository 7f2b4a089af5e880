// crates/toolgate-core/src/tooling.rs
// ============================================================================
// Module: Tooling Identifiers
// Description: Typed tool identifiers and catalogue descriptors.
// Purpose: Shared tool naming across registry, dispatch, and transports.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Backends name their tools with a `Copy` enum implementing [`GatewayTool`],
//! so dispatch is an exhaustive `match` instead of a string switch. The string
//! form only exists at the wire boundary ([`GatewayTool::parse`]) and in the
//! advertised [`ToolDescriptor`].

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Typed tool identifier for a backend catalogue.
pub trait GatewayTool: Copy + Eq + fmt::Display + Send + Sync + 'static {
    /// Returns every tool in canonical catalogue order.
    fn all() -> &'static [Self];

    /// Returns the canonical wire name.
    fn as_str(self) -> &'static str;

    /// Parses a wire name, including legacy aliases.
    fn parse(name: &str) -> Option<Self>;

    /// Returns true for the tool that establishes the session.
    fn is_init(self) -> bool;
}

/// Tool definition advertised by `list_tools`.
///
/// # Invariants
/// - `name` is unique within a catalogue.
/// - `input_schema` is a JSON Schema object (`type`, `properties`, `required`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Tool description for clients.
    pub description: String,
    /// JSON schema for tool arguments.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Builds a descriptor for a typed tool.
    #[must_use]
    pub fn new<T: GatewayTool>(tool: T, description: &str, input_schema: Value) -> Self {
        Self {
            name: tool.as_str().to_string(),
            description: description.to_string(),
            input_schema,
        }
    }
}
