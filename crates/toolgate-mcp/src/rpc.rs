// crates/toolgate-mcp/src/rpc.rs
// ============================================================================
// Module: JSON-RPC Routing
// Description: Maps JSON-RPC 2.0 requests onto the tool gateway.
// Purpose: Share one routing table between the stdio and HTTP transports.
// Dependencies: serde, serde_json, toolgate-core
// ============================================================================

//! ## Overview
//! [`RpcRouter`] accepts an already-parsed JSON value and produces at most one
//! JSON-RPC response plus the labels needed for audit logging. Protocol errors
//! (non-object payloads, wrong `jsonrpc` version, malformed `tools/call`
//! params) become JSON-RPC error objects. Tool failures never do: they are
//! reported inside the result envelope via `isError`.
//!
//! Any method outside the fixed MCP set is treated as a tool name, so a bare
//! `{"method":"init","params":{...}}` invokes the init tool directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use toolgate_core::ToolGateway;

use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// JSON-RPC protocol version string.
pub const JSONRPC_VERSION: &str = "2.0";
/// MCP protocol revision reported by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32_700;
/// The payload is not a valid request object.
pub const INVALID_REQUEST: i64 = -32_600;
/// Method parameters are invalid.
pub const INVALID_PARAMS: i64 = -32_602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32_603;

/// Prefix shared by all MCP notifications.
const NOTIFICATION_PREFIX: &str = "notifications/";

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// JSON-RPC request payload.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version; optional, `"2.0"` when present.
    #[serde(default)]
    pub jsonrpc: Option<String>,
    /// Request identifier.
    #[serde(default)]
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Optional parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC response payload.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol version.
    pub jsonrpc: &'static str,
    /// Request identifier echoed back.
    pub id: Value,
    /// Result payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Builds a success response.
    #[must_use]
    pub const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// JSON-RPC error payload.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
}

/// `tools/call` parameters.
#[derive(Debug, Deserialize)]
struct ToolCallParams {
    /// Tool name.
    name: String,
    /// Raw tool arguments.
    #[serde(default = "empty_arguments")]
    arguments: Value,
}

/// Default argument object for tool calls.
fn empty_arguments() -> Value {
    Value::Object(Map::new())
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Routed request result with audit labels.
#[derive(Debug, Clone)]
pub struct RpcOutcome {
    /// Response to send; `None` for notifications.
    pub response: Option<JsonRpcResponse>,
    /// Request identifier rendered for audit logs.
    pub request_id: Option<String>,
    /// Method classification.
    pub method: McpMethod,
    /// Tool name when a tool was invoked.
    pub tool: Option<String>,
    /// Request outcome.
    pub outcome: McpOutcome,
    /// JSON-RPC error code when the response is an error.
    pub error_code: Option<i64>,
}

impl RpcOutcome {
    /// Builds an outcome for a protocol-level error.
    #[must_use]
    pub fn protocol_error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            request_id: render_id(&id),
            response: Some(JsonRpcResponse::failure(id, code, message)),
            method: McpMethod::Invalid,
            tool: None,
            outcome: McpOutcome::Error,
            error_code: Some(code),
        }
    }

    /// Labels an outcome with its method and tool.
    fn labelled(mut self, method: McpMethod, tool: Option<String>) -> Self {
        self.method = method;
        self.tool = tool;
        self
    }
}

/// Renders a JSON-RPC id for audit logging.
fn render_id(id: &Value) -> Option<String> {
    match id {
        Value::Null => None,
        Value::String(value) => Some(value.clone()),
        other => Some(other.to_string()),
    }
}

// ============================================================================
// SECTION: Router
// ============================================================================

/// Routes JSON-RPC requests to a tool gateway.
#[derive(Clone)]
pub struct RpcRouter {
    /// Gateway serving tool calls.
    gateway: Arc<dyn ToolGateway>,
}

impl RpcRouter {
    /// Creates a router over the provided gateway.
    #[must_use]
    pub fn new(gateway: Arc<dyn ToolGateway>) -> Self {
        Self {
            gateway,
        }
    }

    /// Returns the underlying gateway.
    #[must_use]
    pub fn gateway(&self) -> &Arc<dyn ToolGateway> {
        &self.gateway
    }

    /// Handles one parsed JSON-RPC payload.
    pub async fn handle_value(&self, payload: Value) -> RpcOutcome {
        if !payload.is_object() {
            return RpcOutcome::protocol_error(Value::Null, INVALID_REQUEST, "invalid request");
        }
        let fallback_id = payload.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(payload) {
            Ok(request) => request,
            Err(_) => {
                return RpcOutcome::protocol_error(fallback_id, INVALID_REQUEST, "invalid request");
            }
        };
        if request.jsonrpc.as_deref().is_some_and(|version| version != JSONRPC_VERSION) {
            return RpcOutcome::protocol_error(
                request.id,
                INVALID_REQUEST,
                "invalid json-rpc version",
            );
        }
        self.handle_request(request).await
    }

    /// Dispatches a well-formed request by method.
    async fn handle_request(&self, request: JsonRpcRequest) -> RpcOutcome {
        let JsonRpcRequest {
            id,
            method,
            params,
            ..
        } = request;
        match method.as_str() {
            "initialize" => Self::reply(id, McpMethod::Initialize, None, Ok(self.handshake())),
            "ping" => Self::reply(id, McpMethod::Ping, None, Ok(json!({}))),
            "list_tools" | "ListTools" | "tools/list" => {
                let tools = serde_json::to_value(self.gateway.list_tools())
                    .map(|tools| json!({ "tools": tools }))
                    .map_err(|_| (INTERNAL_ERROR, "tool catalogue serialization failed".to_string()));
                Self::reply(id, McpMethod::ToolsList, None, tools)
            }
            "tools/call" | "CallTool" => {
                let params = params.unwrap_or_else(empty_arguments);
                match serde_json::from_value::<ToolCallParams>(params) {
                    Ok(call) => {
                        self.call_tool(id, McpMethod::ToolsCall, call.name, call.arguments).await
                    }
                    Err(_) => RpcOutcome::protocol_error(id, INVALID_PARAMS, "invalid tool params")
                        .labelled(McpMethod::ToolsCall, None),
                }
            }
            name if name.starts_with(NOTIFICATION_PREFIX) => RpcOutcome {
                response: None,
                request_id: render_id(&id),
                method: McpMethod::Notification,
                tool: None,
                outcome: McpOutcome::Ok,
                error_code: None,
            },
            _ => {
                let arguments = match params {
                    None | Some(Value::Null) => empty_arguments(),
                    Some(arguments) => arguments,
                };
                self.call_tool(id, McpMethod::ToolDirect, method, arguments).await
            }
        }
    }

    /// Invokes a tool and wraps its envelope as a JSON-RPC result.
    async fn call_tool(
        &self,
        id: Value,
        method: McpMethod,
        name: String,
        arguments: Value,
    ) -> RpcOutcome {
        let envelope = self.gateway.call_tool(&name, arguments).await;
        let is_error = envelope.is_error;
        let result = serde_json::to_value(&envelope)
            .map_err(|_| (INTERNAL_ERROR, "result serialization failed".to_string()));
        let mut outcome = Self::reply(id, method, Some(name), result);
        if is_error {
            outcome.outcome = McpOutcome::Error;
        }
        outcome
    }

    /// Builds the response and audit labels for a routed request.
    fn reply(
        id: Value,
        method: McpMethod,
        tool: Option<String>,
        result: Result<Value, (i64, String)>,
    ) -> RpcOutcome {
        match result {
            Ok(result) => RpcOutcome {
                request_id: render_id(&id),
                response: Some(JsonRpcResponse::success(id, result)),
                method,
                tool,
                outcome: McpOutcome::Ok,
                error_code: None,
            },
            Err((code, message)) => {
                RpcOutcome::protocol_error(id, code, message).labelled(method, tool)
            }
        }
    }

    /// Returns the MCP `initialize` handshake payload.
    fn handshake(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "toolgate",
                "title": self.gateway.service_name(),
                "version": env!("CARGO_PKG_VERSION"),
            },
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
