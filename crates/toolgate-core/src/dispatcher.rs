// crates/toolgate-core/src/dispatcher.rs
// ============================================================================
// Module: Dispatcher
// Description: Routes tool calls through readiness, validation, and handlers.
// Purpose: Turn any `(tool, arguments)` pair into exactly one envelope.
// Dependencies: async-trait, serde_json, tokio
// ============================================================================

//! ## Overview
//! Dispatch order is fixed: resolve the tool name, gate on session readiness
//! (skipped for the init tool), validate arguments against the tool schema,
//! then run the handler on its own task under the call timeout. A handler that
//! panics, fails, or overruns is reported through the error envelope; the
//! dispatcher itself never fails and never brings the process down.
//!
//! Security posture: arguments are untrusted input and are schema-checked
//! before any backend code observes them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::backend::Backend;
use crate::backend::BackendError;
use crate::envelope::ResponseEnvelope;
use crate::envelope::ToolOutput;
use crate::error::GatewayError;
use crate::normalizer;
use crate::registry::RegistryError;
use crate::registry::ToolRegistry;
use crate::session::Session;
use crate::tooling::GatewayTool;
use crate::tooling::ToolDescriptor;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default per-call handler timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Dispatcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Upper bound on a single handler invocation.
    pub call_timeout: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

// ============================================================================
// SECTION: Gateway Trait
// ============================================================================

/// Object-safe gateway surface consumed by transports.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    /// Backing service display name.
    fn service_name(&self) -> &'static str;

    /// Returns the advertised tool catalogue.
    fn list_tools(&self) -> Vec<ToolDescriptor>;

    /// Returns true once the session is ready.
    fn is_initialized(&self) -> bool;

    /// Executes a tool call and returns its envelope.
    async fn call_tool(&self, name: &str, arguments: Value) -> ResponseEnvelope;
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Tool dispatcher bound to one backend and one session.
pub struct Dispatcher<B: Backend> {
    /// Backend adapter shared with spawned handler tasks.
    backend: Arc<B>,
    /// Immutable tool catalogue.
    registry: ToolRegistry,
    /// Session holding the backing client.
    session: Arc<Session<B::Client>>,
    /// Per-call handler timeout.
    call_timeout: Duration,
}

impl<B: Backend> Dispatcher<B> {
    /// Builds a dispatcher with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the backend catalogue is inconsistent.
    pub fn new(backend: B, config: DispatcherConfig) -> Result<Self, RegistryError> {
        let session = Arc::new(Session::new(backend.service_name()));
        Self::with_session(backend, session, config)
    }

    /// Builds a dispatcher around an existing session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] when the backend catalogue is inconsistent.
    pub fn with_session(
        backend: B,
        session: Arc<Session<B::Client>>,
        config: DispatcherConfig,
    ) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::build::<B::Tool>(backend.descriptors())?;
        Ok(Self {
            backend: Arc::new(backend),
            registry,
            session,
            call_timeout: config.call_timeout,
        })
    }

    /// Returns the tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the session.
    #[must_use]
    pub fn session(&self) -> &Session<B::Client> {
        &self.session
    }

    /// Resolves and executes a tool call.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] for unknown tools, readiness failures,
    /// invalid arguments, handler failures, and timeouts.
    pub async fn dispatch(&self, name: &str, arguments: Value) -> Result<ToolOutput, GatewayError> {
        let tool = B::Tool::parse(name).ok_or_else(|| GatewayError::UnknownTool(name.to_string()))?;
        let arguments = if arguments.is_null() { Value::Object(Map::new()) } else { arguments };

        if tool.is_init() {
            self.registry.validate_arguments(tool.as_str(), &arguments)?;
            let backend = Arc::clone(&self.backend);
            let attempt = self.guard(tool, async move { backend.connect(arguments).await });
            return self.session.initialize(attempt).await;
        }

        let client = self.session.require_ready()?;
        self.registry.validate_arguments(tool.as_str(), &arguments)?;
        let backend = Arc::clone(&self.backend);
        self.guard(tool, async move { backend.call(tool, &client, arguments).await }).await
    }

    /// Runs a handler future on its own task under the call timeout.
    async fn guard<T, F>(&self, tool: B::Tool, handler: F) -> Result<T, GatewayError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let task = tokio::spawn(handler);
        let abort = task.abort_handle();
        match tokio::time::timeout(self.call_timeout, task).await {
            Ok(Ok(result)) => result.map_err(|err| GatewayError::Handler(err.to_string())),
            Ok(Err(join)) if join.is_panic() => {
                Err(GatewayError::Handler(format!("{tool} handler panicked")))
            }
            Ok(Err(_)) => Err(GatewayError::Handler(format!("{tool} handler was cancelled"))),
            Err(_) => {
                abort.abort();
                Err(GatewayError::Timeout {
                    tool: tool.as_str().to_string(),
                    timeout_ms: u64::try_from(self.call_timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

#[async_trait]
impl<B: Backend> ToolGateway for Dispatcher<B> {
    fn service_name(&self) -> &'static str {
        self.session.service()
    }

    fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.list_tools().to_vec()
    }

    fn is_initialized(&self) -> bool {
        self.session.is_initialized()
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> ResponseEnvelope {
        normalizer::wrap_result(self.dispatch(name, arguments).await)
    }
}
