// crates/toolgate-mcp/src/gateway.rs
// ============================================================================
// Module: Gateway Assembly
// Description: Builds the configured backend gateway and audit sink.
// Purpose: Translate validated configuration into runtime components.
// Dependencies: toolgate-config, toolgate-core, toolgate-providers
// ============================================================================

//! ## Overview
//! One process serves exactly one backend. The backend is chosen by
//! `[backend].kind` and wrapped in a [`Dispatcher`] carrying the configured
//! per-call timeout.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use toolgate_config::BackendKind;
use toolgate_config::ServerAuditConfig;
use toolgate_config::ToolgateConfig;
use toolgate_core::Backend;
use toolgate_core::Dispatcher;
use toolgate_core::DispatcherConfig;
use toolgate_core::ToolDescriptor;
use toolgate_core::ToolGateway;
use toolgate_providers::DocsBackend;
use toolgate_providers::LinearBackend;
use toolgate_providers::SecretsBackend;
use toolgate_providers::docs::docs_descriptors;
use toolgate_providers::linear::linear_descriptors;
use toolgate_providers::secrets::secrets_descriptors;

use crate::audit::McpAuditSink;
use crate::audit::McpFileAuditSink;
use crate::audit::McpNoopAuditSink;
use crate::audit::McpStderrAuditSink;
use crate::server::McpServerError;

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds the gateway for the configured backend.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the backend cannot be constructed.
pub fn build_gateway(config: &ToolgateConfig) -> Result<Arc<dyn ToolGateway>, McpServerError> {
    let dispatcher = DispatcherConfig {
        call_timeout: config.server.call_timeout(),
    };
    match config.backend.kind {
        BackendKind::Linear => {
            let backend = LinearBackend::new(config.linear.clone())
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            wrap(backend, dispatcher)
        }
        BackendKind::SecretsManager => {
            wrap(SecretsBackend::new(config.secrets_manager.clone()), dispatcher)
        }
        BackendKind::Docs => {
            let backend = DocsBackend::new(config.docs.clone())
                .map_err(|err| McpServerError::Init(err.to_string()))?;
            wrap(backend, dispatcher)
        }
    }
}

/// Wraps a backend in a dispatcher.
fn wrap<B: Backend>(
    backend: B,
    config: DispatcherConfig,
) -> Result<Arc<dyn ToolGateway>, McpServerError> {
    let dispatcher =
        Dispatcher::new(backend, config).map_err(|err| McpServerError::Init(err.to_string()))?;
    Ok(Arc::new(dispatcher))
}

/// Returns the static tool catalogue for a backend kind.
#[must_use]
pub fn tool_catalogue(kind: BackendKind) -> Vec<ToolDescriptor> {
    match kind {
        BackendKind::Linear => linear_descriptors(),
        BackendKind::SecretsManager => secrets_descriptors(),
        BackendKind::Docs => docs_descriptors(),
    }
}

/// Builds the audit sink selected by configuration.
///
/// # Errors
///
/// Returns [`McpServerError::Init`] when the audit file cannot be opened.
pub fn audit_sink(config: &ServerAuditConfig) -> Result<Arc<dyn McpAuditSink>, McpServerError> {
    if !config.enabled {
        return Ok(Arc::new(McpNoopAuditSink));
    }
    match &config.path {
        Some(path) => {
            let sink = McpFileAuditSink::new(Path::new(path))
                .map_err(|err| McpServerError::Init(format!("audit log: {err}")))?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(McpStderrAuditSink)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
