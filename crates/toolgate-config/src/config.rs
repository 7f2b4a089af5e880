// crates/toolgate-config/src/config.rs
// ============================================================================
// Module: Toolgate Configuration
// Description: Configuration loading and validation for toolgate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml, toolgate-providers
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then `TOOLGATE_CONFIG`, then
//! `./toolgate.toml`. When neither an explicit path nor the environment
//! variable is set and the default file is absent, built-in defaults apply.
//! Invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use toolgate_providers::DocsConfig;
use toolgate_providers::LinearConfig;
use toolgate_providers::SecretsManagerConfig;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "toolgate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "TOOLGATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Hard ceiling for request body size in bytes.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default per-call timeout in milliseconds.
const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;
/// Minimum per-call timeout in milliseconds.
pub(crate) const MIN_CALL_TIMEOUT_MS: u64 = 100;
/// Maximum per-call timeout in milliseconds.
pub(crate) const MAX_CALL_TIMEOUT_MS: u64 = 300_000;
/// Maximum outbound request timeout in milliseconds.
const MAX_UPSTREAM_TIMEOUT_MS: u64 = 300_000;
/// Maximum redirects the docs backend may follow.
const MAX_DOCS_REDIRECTS: usize = 20;
/// Maximum docs content budget in characters.
const MAX_DOCS_CONTENT_CHARS: usize = 10_000_000;

// ============================================================================
// SECTION: Configuration Model
// ============================================================================

/// Top-level toolgate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolgateConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Linear backend settings.
    #[serde(default)]
    pub linear: LinearConfig,
    /// Secrets Manager backend settings.
    #[serde(default)]
    pub secrets_manager: SecretsManagerConfig,
    /// Documentation backend settings.
    #[serde(default)]
    pub docs: DocsConfig,
}

impl ToolgateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_path(path, env::var(CONFIG_ENV_VAR).ok())? {
            Some(resolved) => Self::load_file(&resolved),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    /// Loads and validates one file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        validate_linear(&self.linear)?;
        validate_secrets_manager(&self.secrets_manager)?;
        validate_docs(&self.docs)?;
        Ok(())
    }
}

/// Supported transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

impl ServerTransport {
    /// Returns the config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Transport type.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,
    /// Audit logging configuration.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            call_timeout_ms: default_call_timeout_ms(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the per-call timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Parses the bind address, if set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<Option<SocketAddr>, ConfigError> {
        let Some(bind) = self.bind.as_deref().map(str::trim).filter(|bind| !bind.is_empty())
        else {
            return Ok(None);
        };
        bind.parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must be at most {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        if !(MIN_CALL_TIMEOUT_MS ..= MAX_CALL_TIMEOUT_MS).contains(&self.call_timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "call_timeout_ms must be between {MIN_CALL_TIMEOUT_MS} and {MAX_CALL_TIMEOUT_MS}"
            )));
        }
        self.audit.validate()?;
        let bind = self.bind_addr()?;
        if self.transport == ServerTransport::Http && bind.is_none() {
            return Err(ConfigError::Invalid("http transport requires bind address".to_string()));
        }
        Ok(())
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Enable structured audit logging.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
    /// Optional JSON-lines file; stderr when unset.
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            path: None,
        }
    }
}

impl ServerAuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("server.audit.path", path)?;
        }
        Ok(())
    }
}

/// Backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Linear GraphQL API.
    #[default]
    Linear,
    /// AWS Secrets Manager.
    SecretsManager,
    /// Backstage documentation.
    Docs,
}

impl BackendKind {
    /// Returns the config label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::SecretsManager => "secrets_manager",
            Self::Docs => "docs",
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Backend served by this process.
    #[serde(default)]
    pub kind: BackendKind,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default per-call timeout.
const fn default_call_timeout_ms() -> u64 {
    DEFAULT_CALL_TIMEOUT_MS
}

/// Audit logging is on unless disabled.
const fn default_audit_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

/// Validates the `[linear]` section.
fn validate_linear(config: &LinearConfig) -> Result<(), ConfigError> {
    validate_http_url("linear.api_url", &config.api_url)?;
    let env_name = config.api_key_env.trim();
    if env_name.is_empty()
        || !env_name.chars().all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_')
    {
        return Err(ConfigError::Invalid(
            "linear.api_key_env must be an uppercase environment variable name".to_string(),
        ));
    }
    validate_timeout("linear.timeout_ms", config.timeout_ms)?;
    validate_non_empty("linear.user_agent", &config.user_agent)
}

/// Validates the `[secrets_manager]` section.
fn validate_secrets_manager(config: &SecretsManagerConfig) -> Result<(), ConfigError> {
    let region = config.region.trim();
    if region.is_empty()
        || !region.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    {
        return Err(ConfigError::Invalid(
            "secrets_manager.region must be a region name like us-east-1".to_string(),
        ));
    }
    if let Some(profile) = &config.profile {
        validate_non_empty("secrets_manager.profile", profile)?;
    }
    if let Some(endpoint) = &config.endpoint_url {
        validate_http_url("secrets_manager.endpoint_url", endpoint)?;
    }
    Ok(())
}

/// Validates the `[docs]` section.
fn validate_docs(config: &DocsConfig) -> Result<(), ConfigError> {
    validate_http_url("docs.base_url", &config.base_url)?;
    validate_timeout("docs.timeout_ms", config.timeout_ms)?;
    if config.max_redirects > MAX_DOCS_REDIRECTS {
        return Err(ConfigError::Invalid(format!(
            "docs.max_redirects must be at most {MAX_DOCS_REDIRECTS}"
        )));
    }
    if config.max_content_chars == 0 || config.max_content_chars > MAX_DOCS_CONTENT_CHARS {
        return Err(ConfigError::Invalid(format!(
            "docs.max_content_chars must be between 1 and {MAX_DOCS_CONTENT_CHARS}"
        )));
    }
    validate_non_empty("docs.user_agent", &config.user_agent)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path.
///
/// Returns `None` when the implicit default file does not exist.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = path {
        return Ok(Some(path.to_path_buf()));
    }
    if let Some(env_path) = env_path.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(Some(PathBuf::from(env_path)));
    }
    let default = PathBuf::from(DEFAULT_CONFIG_NAME);
    Ok(default.is_file().then_some(default))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Requires an absolute http(s) URL with a host.
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::Invalid(format!("{field} must include http:// or https://")))?;
    if rest.is_empty() || rest.starts_with('/') {
        return Err(ConfigError::Invalid(format!("{field} must include a host")));
    }
    Ok(())
}

/// Requires an outbound timeout within bounds.
fn validate_timeout(field: &str, value: u64) -> Result<(), ConfigError> {
    if value == 0 || value > MAX_UPSTREAM_TIMEOUT_MS {
        return Err(ConfigError::Invalid(format!(
            "{field} must be between 1 and {MAX_UPSTREAM_TIMEOUT_MS}"
        )));
    }
    Ok(())
}

/// Requires a non-blank string.
fn validate_non_empty(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::*;

    #[test]
    fn explicit_path_wins_over_environment() {
        let resolved =
            resolve_path(Some(Path::new("a.toml")), Some("b.toml".to_string())).unwrap();
        assert_eq!(resolved, Some(PathBuf::from("a.toml")));
        let resolved = resolve_path(None, Some("b.toml".to_string())).unwrap();
        assert_eq!(resolved, Some(PathBuf::from("b.toml")));
    }

    #[test]
    fn blank_environment_value_is_ignored() {
        let resolved = resolve_path(None, Some("   ".to_string())).unwrap();
        assert!(resolved.is_none() || resolved == Some(PathBuf::from(DEFAULT_CONFIG_NAME)));
    }

    #[test]
    fn oversized_environment_path_is_rejected() {
        let err = resolve_path(None, Some("a".repeat(MAX_TOTAL_PATH_LENGTH + 1))).unwrap_err();
        assert!(err.to_string().contains("config path exceeds max length"));
    }

    #[test]
    fn validate_path_string_rejects_empty_string() {
        let err = validate_path_string("server.audit.path", "  ").unwrap_err();
        assert!(err.to_string().contains("non-empty"));
        validate_path_string("server.audit.path", "./logs/audit.jsonl").unwrap();
    }

    #[test]
    fn http_urls_require_scheme_and_host() {
        validate_http_url("x", "https://api.linear.app/graphql").unwrap();
        validate_http_url("x", "http://127.0.0.1:4566").unwrap();
        assert!(validate_http_url("x", "ftp://example.com").is_err());
        assert!(validate_http_url("x", "https://").is_err());
        assert!(validate_http_url("x", "https:///path").is_err());
    }
}
