// crates/toolgate-mcp/tests/http.rs
// ============================================================================
// Module: HTTP Transport Tests
// Description: End-to-end HTTP JSON-RPC behavior on an ephemeral port.
// Purpose: Validate status codes, routing, and tool error signaling.
// Dependencies: toolgate-mcp, reqwest, tokio
// ============================================================================

//! ## Overview
//! Tool failures must surface as HTTP 200 with `result.isError`; only
//! transport failures map to non-200 statuses.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use toolgate_config::ServerConfig;
use toolgate_config::ServerTransport;
use toolgate_config::ToolgateConfig;
use toolgate_mcp::McpServer;
use toolgate_mcp::McpServerError;

use crate::common::CollectingAudit;
use crate::common::teams_server;

// ============================================================================
// SECTION: Helpers
// ============================================================================

struct Harness {
    base: String,
    client: reqwest::Client,
    audit: Arc<CollectingAudit>,
}

impl Harness {
    async fn start(config: ServerConfig) -> Self {
        let (server, audit) = teams_server(config);
        let server = Arc::new(server);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _task = tokio::spawn(async move { server.serve_http_on(listener).await });
        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            audit,
        }
    }

    async fn post(&self, path: &str, body: &str) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}{path}", self.base))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let text = response.text().await.unwrap();
        (status, serde_json::from_str(&text).unwrap())
    }

    async fn rpc(&self, body: Value) -> (u16, Value) {
        self.post("/rpc", &body.to_string()).await
    }
}

fn text_of(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn list_tools_returns_catalogue() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) = harness.post("/rpc", r#"{"id":1,"method":"list_tools","params":{}}"#).await;

    assert_eq!(status, 200);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 1);
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], "init");
    assert_eq!(tools[1]["name"], "list_teams");
    assert_eq!(tools[1]["description"], "List all teams");
}

#[tokio::test]
async fn unknown_tool_after_init_is_tool_error_with_http_200() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) =
        harness.rpc(json!({"id": 1, "method": "init", "params": {"apiKey": "valid"}})).await;
    assert_eq!(status, 200);
    assert!(body["result"].get("isError").is_none());

    let (status, body) = harness
        .rpc(json!({"id": 2, "method": "tools/call", "params": {"name": "frobnicate"}}))
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        body["result"],
        json!({
            "content": [{"type": "text", "text": "Error: Unknown tool: frobnicate"}],
            "isError": true
        })
    );
}

#[tokio::test]
async fn rejected_credentials_keep_gateway_uninitialized() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (_, body) =
        harness.rpc(json!({"id": 1, "method": "init", "params": {"apiKey": "revoked"}})).await;
    assert_eq!(body["result"]["isError"], true);

    let (status, body) = harness.rpc(json!({"id": 2, "method": "list_teams"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(text_of(&body["result"]), "Error: Teams not initialized; call init first");

    harness.rpc(json!({"id": 3, "method": "init", "params": {"apiKey": "valid"}})).await;
    let (_, body) = harness.rpc(json!({"id": 4, "method": "list_teams"})).await;
    assert!(body["result"].get("isError").is_none());
    assert!(text_of(&body["result"]).starts_with("Found 1 teams:"));
}

#[tokio::test]
async fn unknown_paths_and_methods_return_not_found() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) = harness.post("/other", "{}").await;
    assert_eq!(status, 404);
    assert_eq!(body, json!({"error": "Not Found"}));

    let response = harness.client.get(format!("{}/rpc", harness.base)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
    let body: Value = serde_json::from_str(&response.text().await.unwrap()).unwrap();
    assert_eq!(body, json!({"error": "Not Found"}));
}

#[tokio::test]
async fn malformed_json_is_bad_request_and_server_stays_up() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) = harness.post("/rpc", "{").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].as_str().is_some_and(|message| !message.is_empty()));

    let (status, body) = harness.rpc(json!({"id": 5, "method": "ping"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"], json!({}));
}

#[tokio::test]
async fn oversized_body_is_payload_too_large() {
    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let harness = Harness::start(config).await;
    let body = json!({"id": 1, "method": "ping", "params": {"pad": "x".repeat(256)}});
    let (status, body) = harness.rpc(body).await;
    assert_eq!(status, 413);
    assert_eq!(body, json!({"error": "Payload Too Large"}));
}

#[tokio::test]
async fn non_object_json_is_invalid_request_with_http_200() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) = harness.post("/rpc", "[1,2,3]").await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32_600);
    assert_eq!(body["id"], json!(null));

    let (status, body) = harness.rpc(json!({"jsonrpc": "1.0", "id": 9, "method": "ping"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32_600);
    assert_eq!(body["id"], 9);
}

#[tokio::test]
async fn notifications_get_empty_result_and_are_audited() {
    let harness = Harness::start(ServerConfig::default()).await;
    let (status, body) =
        harness.rpc(json!({"jsonrpc": "2.0", "method": "notifications/initialized"})).await;
    assert_eq!(status, 200);
    assert_eq!(body["result"], json!({}));

    let events = harness.audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].transport, ServerTransport::Http);
}

#[tokio::test]
async fn from_config_rejects_http_without_bind() {
    let mut config = ToolgateConfig::default();
    config.server.transport = ServerTransport::Http;
    let Err(err) = McpServer::from_config(config) else {
        panic!("expected config error");
    };
    assert!(matches!(err, McpServerError::Config(_)));
    assert!(err.to_string().contains("http transport requires bind address"));
}
