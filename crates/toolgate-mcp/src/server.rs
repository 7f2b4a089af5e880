// crates/toolgate-mcp/src/server.rs
// ============================================================================
// Module: MCP Server
// Description: Stdio and HTTP JSON-RPC transports for the tool gateway.
// Purpose: Expose one configured backend over MCP-compatible transports.
// Dependencies: axum, serde_json, tokio, toolgate-config, toolgate-core
// ============================================================================

//! ## Overview
//! The server owns a [`RpcRouter`] and an audit sink and binds them to one
//! transport:
//! - stdio: framing is detected per message; malformed input is answered
//!   with a JSON-RPC error and the loop continues; EOF ends the loop cleanly.
//! - HTTP: `POST /rpc` only. Tool failures still return HTTP 200 with
//!   `result.isError`; transport failures use HTTP status codes.
//!
//! SIGINT and SIGTERM stop either transport after a lifecycle event is logged.
//! No drain is performed.
//!
//! Security posture: all request bytes are untrusted and size-bounded by
//! `server.max_body_bytes` before parsing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncWrite;
use tokio::io::BufReader;
use tokio::net::TcpListener;
use toolgate_config::ServerConfig;
use toolgate_config::ServerTransport;
use toolgate_config::ToolgateConfig;
use toolgate_core::ToolGateway;

use crate::audit::LifecycleEvent;
use crate::audit::LifecycleKind;
use crate::audit::McpAuditEvent;
use crate::audit::McpAuditEventParams;
use crate::audit::McpAuditSink;
use crate::framing::Frame;
use crate::framing::read_frame;
use crate::framing::write_frame;
use crate::gateway::audit_sink;
use crate::gateway::build_gateway;
use crate::rpc::JsonRpcResponse;
use crate::rpc::PARSE_ERROR;
use crate::rpc::RpcOutcome;
use crate::rpc::RpcRouter;
use crate::telemetry::McpMethod;
use crate::telemetry::McpOutcome;

// ============================================================================
// SECTION: Server
// ============================================================================

/// MCP server instance.
pub struct McpServer {
    /// Server configuration.
    config: ServerConfig,
    /// JSON-RPC router bound to the gateway.
    router: RpcRouter,
    /// Audit sink for request and lifecycle events.
    audit: Arc<dyn McpAuditSink>,
}

impl McpServer {
    /// Builds a server from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when validation or initialization fails.
    pub fn from_config(config: ToolgateConfig) -> Result<Self, McpServerError> {
        config.validate().map_err(|err| McpServerError::Config(err.to_string()))?;
        let gateway = build_gateway(&config)?;
        let audit = audit_sink(&config.server.audit)?;
        Ok(Self::new(config.server, gateway, audit))
    }

    /// Builds a server from prepared components.
    #[must_use]
    pub fn new(
        config: ServerConfig,
        gateway: Arc<dyn ToolGateway>,
        audit: Arc<dyn McpAuditSink>,
    ) -> Self {
        Self {
            config,
            router: RpcRouter::new(gateway),
            audit,
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves requests on the configured transport until EOF or a signal.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError`] when the transport fails.
    pub async fn serve(&self) -> Result<(), McpServerError> {
        match self.config.transport {
            ServerTransport::Stdio => {
                let reader = BufReader::new(tokio::io::stdin());
                let writer = tokio::io::stdout();
                tokio::select! {
                    result = self.serve_stdio_with(reader, writer) => result,
                    signal = shutdown_signal() => {
                        self.record_signal(signal);
                        Ok(())
                    }
                }
            }
            ServerTransport::Http => {
                let addr = self
                    .config
                    .bind_addr()
                    .map_err(|err| McpServerError::Config(err.to_string()))?
                    .ok_or_else(|| {
                        McpServerError::Config("http transport requires bind address".to_string())
                    })?;
                let listener = TcpListener::bind(addr)
                    .await
                    .map_err(|err| McpServerError::Init(format!("bind {addr}: {err}")))?;
                tokio::select! {
                    result = self.serve_http_on(listener) => result,
                    signal = shutdown_signal() => {
                        self.record_signal(signal);
                        Ok(())
                    }
                }
            }
        }
    }

    /// Records a termination signal.
    fn record_signal(&self, signal: &str) {
        self.audit.record_lifecycle(&LifecycleEvent::new(
            LifecycleKind::Signal,
            format!("received {signal}, shutting down"),
        ));
    }

    // ------------------------------------------------------------------------
    // Stdio transport
    // ------------------------------------------------------------------------

    /// Serves framed JSON-RPC over the provided byte streams until EOF.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] when reading or writing fails.
    pub async fn serve_stdio_with<R, W>(&self, reader: R, writer: W) -> Result<(), McpServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = reader;
        let mut writer = writer;
        self.audit.record_lifecycle(&LifecycleEvent::new(LifecycleKind::Started, "stdio"));
        loop {
            let frame = read_frame(&mut reader, self.config.max_body_bytes)
                .await
                .map_err(|err| McpServerError::Transport(err.to_string()))?;
            let (framing, outcome, request_bytes) = match frame {
                Frame::Eof => {
                    self.audit.record_lifecycle(&LifecycleEvent::new(
                        LifecycleKind::Stopped,
                        "stdin closed",
                    ));
                    return Ok(());
                }
                Frame::Rejected {
                    framing,
                    code,
                    message,
                    consumed,
                } => (framing, RpcOutcome::protocol_error(Value::Null, code, message), consumed),
                Frame::Message {
                    framing,
                    body,
                } => {
                    let outcome = match serde_json::from_slice::<Value>(&body) {
                        Ok(payload) => self.router.handle_value(payload).await,
                        Err(_) => RpcOutcome::protocol_error(Value::Null, PARSE_ERROR, "parse error"),
                    };
                    (framing, outcome, body.len())
                }
            };
            let mut response_bytes = 0;
            if let Some(response) = &outcome.response {
                let payload = serde_json::to_vec(response)
                    .map_err(|err| McpServerError::Transport(err.to_string()))?;
                write_frame(&mut writer, framing, &payload)
                    .await
                    .map_err(|err| McpServerError::Transport(err.to_string()))?;
                response_bytes = payload.len();
            }
            self.record(ServerTransport::Stdio, &outcome, request_bytes, response_bytes);
        }
    }

    // ------------------------------------------------------------------------
    // HTTP transport
    // ------------------------------------------------------------------------

    /// Returns the axum router for the HTTP transport.
    #[must_use]
    pub fn http_router(&self) -> Router {
        let state = Arc::new(HttpState {
            router: self.router.clone(),
            audit: Arc::clone(&self.audit),
            max_body_bytes: self.config.max_body_bytes,
        });
        Router::new()
            .route("/rpc", post(handle_http).fallback(handle_not_found))
            .fallback(handle_not_found)
            .with_state(state)
    }

    /// Serves the HTTP transport on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns [`McpServerError::Transport`] when the HTTP server fails.
    pub async fn serve_http_on(&self, listener: TcpListener) -> Result<(), McpServerError> {
        let local = listener
            .local_addr()
            .map(|addr: SocketAddr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        self.audit.record_lifecycle(&LifecycleEvent::new(
            LifecycleKind::Started,
            format!("http listening on {local}"),
        ));
        axum::serve(listener, self.http_router())
            .await
            .map_err(|err| McpServerError::Transport(err.to_string()))?;
        self.audit.record_lifecycle(&LifecycleEvent::new(LifecycleKind::Stopped, "http"));
        Ok(())
    }

    /// Records a request audit event.
    fn record(
        &self,
        transport: ServerTransport,
        outcome: &RpcOutcome,
        request_bytes: usize,
        response_bytes: usize,
    ) {
        record_outcome(self.audit.as_ref(), transport, outcome, request_bytes, response_bytes);
    }
}

/// Writes one request audit event.
fn record_outcome(
    audit: &dyn McpAuditSink,
    transport: ServerTransport,
    outcome: &RpcOutcome,
    request_bytes: usize,
    response_bytes: usize,
) {
    audit.record(&McpAuditEvent::new(McpAuditEventParams {
        request_id: outcome.request_id.clone(),
        transport,
        method: outcome.method,
        tool: outcome.tool.clone(),
        outcome: outcome.outcome,
        error_code: outcome.error_code,
        request_bytes,
        response_bytes,
    }));
}

// ============================================================================
// SECTION: HTTP Handlers
// ============================================================================

/// Shared state for HTTP handlers.
struct HttpState {
    /// JSON-RPC router.
    router: RpcRouter,
    /// Audit sink.
    audit: Arc<dyn McpAuditSink>,
    /// Maximum request body size.
    max_body_bytes: usize,
}

/// Handles `POST /rpc`.
async fn handle_http(State(state): State<Arc<HttpState>>, request: Request) -> Response {
    let Ok(body) = to_bytes(request.into_body(), state.max_body_bytes).await else {
        record_rejection(&state, state.max_body_bytes);
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(json!({ "error": "Payload Too Large" })))
            .into_response();
    };
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            record_rejection(&state, body.len());
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Bad Request", "message": err.to_string() })),
            )
                .into_response();
        }
    };
    let outcome = state.router.handle_value(payload).await;
    let response = outcome
        .response
        .clone()
        .unwrap_or_else(|| JsonRpcResponse::success(Value::Null, json!({})));
    let Ok(bytes) = serde_json::to_vec(&response) else {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Internal Error" })))
            .into_response();
    };
    record_outcome(state.audit.as_ref(), ServerTransport::Http, &outcome, body.len(), bytes.len());
    (StatusCode::OK, [(CONTENT_TYPE, "application/json")], bytes).into_response()
}

/// Records a request rejected before routing.
fn record_rejection(state: &HttpState, request_bytes: usize) {
    state.audit.record(&McpAuditEvent::new(McpAuditEventParams {
        request_id: None,
        transport: ServerTransport::Http,
        method: McpMethod::Invalid,
        tool: None,
        outcome: McpOutcome::Error,
        error_code: None,
        request_bytes,
        response_bytes: 0,
    }));
}

/// Handles unknown paths and methods.
async fn handle_not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response()
}

// ============================================================================
// SECTION: Signals
// ============================================================================

/// Resolves when the process receives SIGINT or SIGTERM.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    let Ok(mut terminate) = signal(SignalKind::terminate()) else {
        wait_ctrl_c().await;
        return "SIGINT";
    };
    tokio::select! {
        () = wait_ctrl_c() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
    }
}

/// Resolves when the process receives Ctrl-C.
#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    wait_ctrl_c().await;
    "SIGINT"
}

/// Waits for Ctrl-C; never resolves if the handler cannot be installed.
async fn wait_ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// MCP server errors.
#[derive(Debug, Error)]
pub enum McpServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
