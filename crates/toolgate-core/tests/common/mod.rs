// crates/toolgate-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted backend for dispatcher tests.
// Purpose: Exercise dispatch without any network dependency.
// Dependencies: toolgate-core
// ============================================================================

//! ## Overview
//! [`ScriptedBackend`] exposes a small catalogue whose handlers echo, sleep,
//! fail, or panic on demand, and counts how often each path ran.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use toolgate_core::Backend;
use toolgate_core::BackendError;
use toolgate_core::Connected;
use toolgate_core::GatewayTool;
use toolgate_core::ToolDescriptor;
use toolgate_core::ToolOutput;

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Scripted tool set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedTool {
    /// Establishes the session.
    Init,
    /// Echoes `message`.
    Echo,
    /// Sleeps for `millis`.
    Sleep,
    /// Always fails.
    Fail,
    /// Always panics.
    Explode,
}

impl fmt::Display for ScriptedTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl GatewayTool for ScriptedTool {
    fn all() -> &'static [Self] {
        &[Self::Init, Self::Echo, Self::Sleep, Self::Fail, Self::Explode]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Echo => "echo",
            Self::Sleep => "sleep",
            Self::Fail => "fail",
            Self::Explode => "explode",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name).or_else(|| {
            (name == "init_scripted").then_some(Self::Init)
        })
    }

    fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Backend whose behavior is fully determined by arguments.
#[derive(Debug, Default, Clone)]
pub struct ScriptedBackend {
    /// Number of connect attempts.
    pub connects: Arc<AtomicUsize>,
    /// Number of non-init handler invocations.
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    /// Returns the connect attempt count.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Returns the handler invocation count.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    type Client = String;
    type Tool = ScriptedTool;

    fn service_name(&self) -> &'static str {
        "Scripted"
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                ScriptedTool::Init,
                "Initialize the scripted service",
                json!({
                    "type": "object",
                    "properties": {
                        "token": {"type": "string"},
                        "delayMs": {"type": "integer", "minimum": 0}
                    },
                    "required": ["token"]
                }),
            ),
            ToolDescriptor::new(
                ScriptedTool::Echo,
                "Echo a message",
                json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
            ),
            ToolDescriptor::new(
                ScriptedTool::Sleep,
                "Sleep for a while",
                json!({
                    "type": "object",
                    "properties": {"millis": {"type": "integer", "minimum": 0}},
                    "required": ["millis"]
                }),
            ),
            ToolDescriptor::new(ScriptedTool::Fail, "Always fails", json!({"type": "object"})),
            ToolDescriptor::new(ScriptedTool::Explode, "Always panics", json!({"type": "object"})),
        ]
    }

    async fn connect(&self, arguments: Value) -> Result<Connected<String>, BackendError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = arguments.get("delayMs").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let token = arguments["token"].as_str().unwrap_or_default().to_string();
        if token == "bad" {
            return Err(BackendError::Auth("Invalid token".to_string()));
        }
        Ok(Connected {
            summary: ToolOutput::new("Scripted initialized", json!({"token": "***"})),
            client: token,
        })
    }

    async fn call(
        &self,
        tool: ScriptedTool,
        client: &String,
        arguments: Value,
    ) -> Result<ToolOutput, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match tool {
            ScriptedTool::Init => Err(BackendError::Internal("init routed to call".to_string())),
            ScriptedTool::Echo => Ok(ToolOutput::body(json!({
                "client": client,
                "message": arguments["message"],
            }))),
            ScriptedTool::Sleep => {
                let millis = arguments["millis"].as_u64().unwrap_or_default();
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(ToolOutput::message("awake"))
            }
            ScriptedTool::Fail => Err(BackendError::NotFound("Issue ABC-1 not found".to_string())),
            ScriptedTool::Explode => panic!("scripted handler panic"),
        }
    }
}
