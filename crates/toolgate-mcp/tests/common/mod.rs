// crates/toolgate-mcp/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: In-process backend, audit collector, and transport drivers.
// Purpose: Exercise both transports against a real dispatcher.
// Dependencies: toolgate-core, toolgate-mcp, tokio
// ============================================================================

//! ## Overview
//! [`TeamsBackend`] accepts the API key `"valid"` and rejects everything else
//! with an authentication error, mirroring a vendor 401.

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
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use toolgate_config::ServerConfig;
use toolgate_core::Backend;
use toolgate_core::BackendError;
use toolgate_core::Connected;
use toolgate_core::Dispatcher;
use toolgate_core::DispatcherConfig;
use toolgate_core::GatewayTool;
use toolgate_core::ToolDescriptor;
use toolgate_core::ToolOutput;
use toolgate_mcp::LifecycleEvent;
use toolgate_mcp::McpAuditEvent;
use toolgate_mcp::McpAuditSink;
use toolgate_mcp::McpServer;

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Tools exposed by [`TeamsBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamsTool {
    /// Establishes the session.
    Init,
    /// Lists teams.
    ListTeams,
}

impl fmt::Display for TeamsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl GatewayTool for TeamsTool {
    fn all() -> &'static [Self] {
        &[Self::Init, Self::ListTeams]
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::ListTeams => "list_teams",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|tool| tool.as_str() == name)
    }

    fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

/// Backend with a fixed team list.
pub struct TeamsBackend;

#[async_trait]
impl Backend for TeamsBackend {
    type Client = String;
    type Tool = TeamsTool;

    fn service_name(&self) -> &'static str {
        "Teams"
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new(
                TeamsTool::Init,
                "Initialize the teams client",
                json!({
                    "type": "object",
                    "properties": {"apiKey": {"type": "string"}},
                    "required": ["apiKey"]
                }),
            ),
            ToolDescriptor::new(
                TeamsTool::ListTeams,
                "List all teams",
                json!({"type": "object", "properties": {}}),
            ),
        ]
    }

    async fn connect(&self, arguments: Value) -> Result<Connected<String>, BackendError> {
        let key = arguments["apiKey"].as_str().unwrap_or_default().to_string();
        if key != "valid" {
            return Err(BackendError::Auth("Authentication failed (HTTP 401)".to_string()));
        }
        Ok(Connected {
            summary: ToolOutput::new("Teams initialized", json!({"apiKey": "***"})),
            client: key,
        })
    }

    async fn call(
        &self,
        tool: TeamsTool,
        _client: &String,
        _arguments: Value,
    ) -> Result<ToolOutput, BackendError> {
        match tool {
            TeamsTool::Init => Err(BackendError::Internal("init routed to call".to_string())),
            TeamsTool::ListTeams => Ok(ToolOutput::new(
                "Found 1 teams:",
                json!([{"id": "team-1", "name": "Core", "key": "COR"}]),
            )),
        }
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps every event in memory.
#[derive(Default)]
pub struct CollectingAudit {
    /// Request events.
    pub events: Mutex<Vec<McpAuditEvent>>,
    /// Lifecycle events.
    pub lifecycle: Mutex<Vec<LifecycleEvent>>,
}

impl CollectingAudit {
    /// Returns a snapshot of request events.
    pub fn events(&self) -> Vec<McpAuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Returns a snapshot of lifecycle events.
    pub fn lifecycle(&self) -> Vec<LifecycleEvent> {
        self.lifecycle.lock().unwrap().clone()
    }
}

impl McpAuditSink for CollectingAudit {
    fn record(&self, event: &McpAuditEvent) {
        self.events.lock().unwrap().push(event.clone());
    }

    fn record_lifecycle(&self, event: &LifecycleEvent) {
        self.lifecycle.lock().unwrap().push(event.clone());
    }
}

// ============================================================================
// SECTION: Server Builders
// ============================================================================

/// Builds a server over [`TeamsBackend`] with an in-memory audit sink.
pub fn teams_server(config: ServerConfig) -> (McpServer, Arc<CollectingAudit>) {
    let gateway = Dispatcher::new(TeamsBackend, DispatcherConfig::default()).unwrap();
    let audit = Arc::new(CollectingAudit::default());
    let server = McpServer::new(config, Arc::new(gateway), audit.clone());
    (server, audit)
}

// ============================================================================
// SECTION: Stdio Driver
// ============================================================================

/// Feeds `input` to the stdio loop until EOF and returns everything written.
pub async fn run_stdio(server: &McpServer, input: &[u8]) -> Vec<u8> {
    let (mut client, server_io) = tokio::io::duplex(1 << 20);
    client.write_all(input).await.unwrap();
    client.shutdown().await.unwrap();
    let (read, write) = tokio::io::split(server_io);
    server.serve_stdio_with(BufReader::new(read), write).await.unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    out
}

/// Parses newline-delimited JSON replies.
pub fn parse_lines(output: &[u8]) -> Vec<Value> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Parses `Content-Length` framed replies.
pub fn parse_framed(output: &[u8]) -> Vec<Value> {
    let text = String::from_utf8(output.to_vec()).unwrap();
    let mut rest = text.as_str();
    let mut messages = Vec::new();
    while let Some(header_end) = rest.find("\r\n\r\n") {
        let header = &rest[.. header_end];
        let length: usize =
            header.strip_prefix("Content-Length: ").expect("content length header").parse().unwrap();
        let body_start = header_end + 4;
        messages.push(serde_json::from_str(&rest[body_start .. body_start + length]).unwrap());
        rest = &rest[body_start + length ..];
    }
    messages
}
