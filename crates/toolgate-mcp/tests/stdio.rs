// crates/toolgate-mcp/tests/stdio.rs
// ============================================================================
// Module: Stdio Transport Tests
// Description: End-to-end stdio JSON-RPC behavior over in-memory pipes.
// Purpose: Validate framing, liveness after bad input, and lifecycle logging.
// Dependencies: toolgate-mcp, tokio
// ============================================================================

//! ## Overview
//! Each test writes a full request stream into a duplex pipe, closes it, and
//! inspects the replies written before the loop observed EOF.

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

use serde_json::json;
use toolgate_config::ServerConfig;
use toolgate_mcp::LifecycleKind;
use toolgate_mcp::McpMethod;
use toolgate_mcp::McpOutcome;

use crate::common::parse_framed;
use crate::common::parse_lines;
use crate::common::run_stdio;
use crate::common::teams_server;

#[tokio::test]
async fn malformed_request_does_not_stop_the_loop() {
    let (server, _audit) = teams_server(ServerConfig::default());
    let input = b"{\n{\"id\":2,\"method\":\"init\",\"params\":{\"apiKey\":\"valid\"}}\n";
    let replies = parse_lines(&run_stdio(&server, input).await);

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["jsonrpc"], "2.0");
    assert_eq!(replies[0]["id"], json!(null));
    assert_eq!(replies[0]["error"]["code"], -32_700);
    assert_eq!(replies[1]["id"], 2);
    assert!(replies[1]["result"].get("isError").is_none());
    let text = replies[1]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Teams initialized"));
}

#[tokio::test]
async fn rejected_init_leaves_session_uninitialized() {
    let (server, _audit) = teams_server(ServerConfig::default());
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"init","arguments":{"apiKey":"bad"}}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"list_teams"}}"#,
        "\n",
    );
    let replies = parse_lines(&run_stdio(&server, input.as_bytes()).await);

    assert_eq!(replies[0]["result"]["isError"], true);
    assert_eq!(
        replies[0]["result"]["content"][0]["text"],
        "Error: Failed to initialize Teams: Authentication failed (HTTP 401)"
    );
    assert_eq!(replies[1]["result"]["isError"], true);
    let text = replies[1]["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("not initialized"));
}

#[tokio::test]
async fn content_length_requests_get_framed_replies() {
    let (server, _audit) = teams_server(ServerConfig::default());
    let body = r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#;
    let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
    let replies = parse_framed(&run_stdio(&server, input.as_bytes()).await);

    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], "a");
    let names: Vec<&str> = replies[0]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["init", "list_teams"]);
    assert!(replies[0]["result"]["tools"][0]["inputSchema"].is_object());
}

#[tokio::test]
async fn notifications_are_silent() {
    let (server, audit) = teams_server(ServerConfig::default());
    let input = concat!(
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#,
        "\n",
    );
    let replies = parse_lines(&run_stdio(&server, input.as_bytes()).await);

    assert_eq!(replies, vec![json!({"jsonrpc": "2.0", "id": 7, "result": {}})]);
    let methods: Vec<McpMethod> = audit.events().iter().map(|event| event.method).collect();
    assert_eq!(methods, vec![McpMethod::Notification, McpMethod::Ping]);
}

#[tokio::test]
async fn oversized_line_is_rejected_and_next_request_served() {
    let config = ServerConfig {
        max_body_bytes: 64,
        ..ServerConfig::default()
    };
    let (server, _audit) = teams_server(config);
    let mut input = format!(r#"{{"id":1,"method":"ping","params":{{"pad":"{}"}}}}"#, "x".repeat(200))
        .into_bytes();
    input.extend_from_slice(b"\n{\"id\":2,\"method\":\"ping\"}\n");
    let replies = parse_lines(&run_stdio(&server, &input).await);

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["error"]["code"], -32_600);
    assert_eq!(replies[0]["id"], json!(null));
    assert_eq!(replies[1]["id"], 2);
    assert_eq!(replies[1]["result"], json!({}));
}

#[tokio::test]
async fn wrong_jsonrpc_version_is_invalid_request() {
    let (server, _audit) = teams_server(ServerConfig::default());
    let input = b"{\"jsonrpc\":\"1.0\",\"id\":3,\"method\":\"ping\"}\n[1,2]\n";
    let replies = parse_lines(&run_stdio(&server, input).await);

    assert_eq!(replies[0]["error"]["code"], -32_600);
    assert_eq!(replies[0]["id"], 3);
    assert_eq!(replies[1]["error"]["code"], -32_600);
}

#[tokio::test]
async fn audit_records_lifecycle_and_redacts_arguments() {
    let (server, audit) = teams_server(ServerConfig::default());
    let input = b"{\"id\":1,\"method\":\"init\",\"params\":{\"apiKey\":\"valid\"}}\n";
    run_stdio(&server, input).await;

    let lifecycle: Vec<LifecycleKind> = audit.lifecycle().iter().map(|event| event.kind).collect();
    assert_eq!(lifecycle, vec![LifecycleKind::Started, LifecycleKind::Stopped]);

    let events = audit.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].method, McpMethod::ToolDirect);
    assert_eq!(events[0].tool.as_deref(), Some("init"));
    assert_eq!(events[0].outcome, McpOutcome::Ok);
    assert_eq!(events[0].request_id.as_deref(), Some("1"));
    assert!(events[0].response_bytes > 0);
    let serialized = serde_json::to_string(&events[0]).unwrap();
    assert!(!serialized.contains("valid"));
}

#[tokio::test]
async fn empty_input_ends_cleanly() {
    let (server, audit) = teams_server(ServerConfig::default());
    let output = run_stdio(&server, b"").await;
    assert!(output.is_empty());
    assert!(audit.events().is_empty());
}
