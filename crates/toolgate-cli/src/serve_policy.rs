// crates/toolgate-cli/src/serve_policy.rs
// ============================================================================
// Module: Serve Policy
// Description: Network exposure policy checks for the CLI server launcher.
// Purpose: Enforce loopback-only binds unless explicitly opted out.
// Dependencies: thiserror, toolgate-config
// ============================================================================

//! ## Overview
//! The HTTP transport has no authentication of its own, and `init` accepts
//! vendor credentials. The policy is fail-closed: a non-loopback bind needs
//! `--allow-non-loopback` or `TOOLGATE_ALLOW_NON_LOOPBACK`.

use std::env;
use std::net::SocketAddr;

use thiserror::Error;
use toolgate_config::ServerTransport;
use toolgate_config::ToolgateConfig;

/// Environment variable enabling non-loopback server binds.
pub const ALLOW_NON_LOOPBACK_ENV: &str = "TOOLGATE_ALLOW_NON_LOOPBACK";

/// Bind outcome metadata for transport warnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    /// Selected transport.
    pub transport: ServerTransport,
    /// Bound socket address for the HTTP transport.
    pub bind_addr: Option<SocketAddr>,
    /// True when the server is bound to a non-loopback address.
    pub network_exposed: bool,
    /// Whether audit logging is enabled.
    pub audit_enabled: bool,
}

/// Serve policy failures for bind safety.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServePolicyError {
    /// Environment variable was set to an invalid value.
    #[error("{} has invalid value '{value}' (expected true/false/1/0)", ALLOW_NON_LOOPBACK_ENV)]
    InvalidEnv {
        /// Raw environment value.
        value: String,
    },
    /// Bind string failed to parse.
    #[error("invalid bind address '{bind}': {error}")]
    InvalidBind {
        /// Raw bind value.
        bind: String,
        /// Parse error message.
        error: String,
    },
    /// Non-loopback binding requires explicit opt-in.
    #[error(
        "refusing to bind to non-loopback address {bind}; pass --allow-non-loopback or set {}=1",
        ALLOW_NON_LOOPBACK_ENV
    )]
    NonLoopbackOptInRequired {
        /// Bind address.
        bind: String,
    },
}

/// Resolves the non-loopback opt-in flag from CLI and environment.
///
/// # Errors
/// Returns [`ServePolicyError::InvalidEnv`] when the environment value is invalid.
pub fn resolve_allow_non_loopback(flag: bool) -> Result<bool, ServePolicyError> {
    if flag {
        return Ok(true);
    }
    let Some(value) = env::var_os(ALLOW_NON_LOOPBACK_ENV) else {
        return Ok(false);
    };
    parse_allow_non_loopback_value(&value.to_string_lossy())
}

/// Enforces local-only transport restrictions for the MCP server.
///
/// # Errors
/// Returns [`ServePolicyError`] when the bind address is unsafe or invalid.
pub fn enforce_local_only(
    config: &ToolgateConfig,
    allow_non_loopback: bool,
) -> Result<BindOutcome, ServePolicyError> {
    let audit_enabled = config.server.audit.enabled;
    match config.server.transport {
        ServerTransport::Stdio => Ok(BindOutcome {
            transport: ServerTransport::Stdio,
            bind_addr: None,
            network_exposed: false,
            audit_enabled,
        }),
        ServerTransport::Http => {
            let bind = config.server.bind.as_deref().unwrap_or_default().trim();
            let addr: SocketAddr = bind.parse().map_err(|err: std::net::AddrParseError| {
                ServePolicyError::InvalidBind {
                    bind: bind.to_string(),
                    error: err.to_string(),
                }
            })?;
            let network_exposed = !addr.ip().is_loopback();
            if network_exposed && !allow_non_loopback {
                return Err(ServePolicyError::NonLoopbackOptInRequired {
                    bind: bind.to_string(),
                });
            }
            Ok(BindOutcome {
                transport: ServerTransport::Http,
                bind_addr: Some(addr),
                network_exposed,
                audit_enabled,
            })
        }
    }
}

/// Parses a bool-ish string (true/false/1/0/yes/no/on/off).
fn parse_boolish(value: &str) -> Option<bool> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Parses an env value for allow-non-loopback.
fn parse_allow_non_loopback_value(value: &str) -> Result<bool, ServePolicyError> {
    parse_boolish(value).ok_or_else(|| ServePolicyError::InvalidEnv {
        value: value.to_string(),
    })
}
