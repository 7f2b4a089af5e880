// crates/toolgate-providers/src/docs.rs
// ============================================================================
// Module: Documentation Backend
// Description: Fetches Backstage documentation pages over HTTPS.
// Purpose: Expose ping, search, and page fetch tools bound to one docs host.
// Dependencies: toolgate-core, reqwest, time
// ============================================================================

//! ## Overview
//! The docs backend resolves a request to a single URL under the configured
//! base, fetches it with a bounded redirect policy and timeout, and returns
//! the content truncated to a character budget.
//!
//! Security posture: every resolved `docPath` and every redirect hop must
//! stay on the base origin so the tool cannot be used as an open fetch proxy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use toolgate_core::Backend;
use toolgate_core::BackendError;
use toolgate_core::Connected;
use toolgate_core::GatewayTool;
use toolgate_core::ToolDescriptor;
use toolgate_core::ToolOutput;
use toolgate_core::decode_arguments;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default documentation host.
pub const DEFAULT_DOCS_BASE_URL: &str = "https://backstage.io";

/// `[docs]` configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocsConfig {
    /// Base URL used when init supplies none.
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Redirects followed before failing.
    pub max_redirects: usize,
    /// Character budget for returned content.
    pub max_content_chars: usize,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DOCS_BASE_URL.to_string(),
            timeout_ms: 10_000,
            max_redirects: 5,
            max_content_chars: 50_000,
            user_agent: "toolgate-docs/0.1".to_string(),
        }
    }
}

// ============================================================================
// SECTION: Tools
// ============================================================================

/// Documentation tool identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsTool {
    /// Validate the base URL.
    Init,
    /// Liveness probe.
    Ping,
    /// Search or fetch documentation.
    Search,
    /// Fetch a documentation page.
    GetBackstageDocs,
}

impl DocsTool {
    /// Canonical catalogue order.
    const ALL: [Self; 4] = [Self::Init, Self::Ping, Self::Search, Self::GetBackstageDocs];
}

impl fmt::Display for DocsTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl GatewayTool for DocsTool {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Ping => "context7.ping",
            Self::Search => "context7.search",
            Self::GetBackstageDocs => "context7.getBackstageDocs",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        if name == "init_docs" {
            return Some(Self::Init);
        }
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn is_init(self) -> bool {
        matches!(self, Self::Init)
    }
}

/// Returns the documentation tool catalogue.
#[must_use]
pub fn docs_descriptors() -> Vec<ToolDescriptor> {
    let fetch_schema = json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "Search query"},
            "docPath": {
                "type": "string",
                "description": "Documentation path relative to the base URL, or an absolute URL on the same host"
            }
        }
    });
    vec![
        ToolDescriptor::new(
            DocsTool::Init,
            "Validate the documentation base URL and open the session",
            json!({
                "type": "object",
                "properties": {
                    "baseUrl": {"type": "string", "description": "Documentation base URL (default: https://backstage.io)"}
                }
            }),
        ),
        ToolDescriptor::new(
            DocsTool::Ping,
            "Check that the documentation backend is responsive",
            json!({"type": "object", "properties": {}}),
        ),
        ToolDescriptor::new(
            DocsTool::Search,
            "Search Backstage documentation",
            fetch_schema.clone(),
        ),
        ToolDescriptor::new(
            DocsTool::GetBackstageDocs,
            "Fetch a Backstage documentation page",
            fetch_schema,
        ),
    ]
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// HTTP client bound to one documentation host.
#[derive(Debug, Clone)]
pub struct DocsClient {
    /// HTTP client with timeout and redirect policy.
    http: Client,
    /// Base URL.
    base_url: Url,
    /// Character budget for content.
    max_content_chars: usize,
}

/// Fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    /// Response content type.
    pub content_type: Option<String>,
    /// Body text, truncated.
    pub content: String,
}

impl DocsClient {
    /// Returns the base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves the URL for a fetch request.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Validation`] when `doc_path` is malformed or
    /// points at a different host.
    pub fn resolve_url(&self, query: Option<&str>, doc_path: Option<&str>) -> Result<Url, BackendError> {
        if let Some(path) = doc_path.filter(|path| !path.is_empty()) {
            let url = if path.starts_with("http://") || path.starts_with("https://") {
                Url::parse(path)
            } else if path.starts_with('/') {
                self.base_url.join(path)
            } else {
                self.base_url.join(&format!("/{path}"))
            }
            .map_err(|err| BackendError::Validation(format!("invalid docPath: {err}")))?;
            if !same_origin(&url, &self.base_url) {
                return Err(BackendError::Validation(format!(
                    "docPath host {} is not allowed",
                    url.host_str().unwrap_or("<none>")
                )));
            }
            return Ok(url);
        }
        let mut url = self
            .base_url
            .join("/docs")
            .map_err(|err| BackendError::Internal(format!("invalid base URL: {err}")))?;
        if let Some(query) = query.filter(|query| !query.is_empty()) {
            url.set_path("/docs/search");
            url.query_pairs_mut().append_pair("q", query);
        }
        Ok(url)
    }

    /// Fetches one page.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Network`] on transport failure or timeout and
    /// [`BackendError::Api`] for non-success statuses.
    pub async fn fetch(&self, url: Url) -> Result<FetchedPage, BackendError> {
        let response = self
            .http
            .get(url)
            .header(ACCEPT, "text/html,application/json")
            .send()
            .await
            .map_err(network_error)?;
        let status = response.status();
        if status.is_redirection() {
            return Err(BackendError::Validation(
                "redirect to a different host is not allowed".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(BackendError::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        let url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(network_error)?;
        Ok(FetchedPage {
            url,
            content_type,
            content: truncate_chars(&body, self.max_content_chars),
        })
    }
}

/// Returns true when both URLs share scheme, host, and port.
fn same_origin(url: &Url, base: &Url) -> bool {
    url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default()
}

/// Follows at most `max_redirects` redirects and stops at the first hop
/// leaving the origin of the initial request.
fn redirect_policy(max_redirects: usize) -> Policy {
    Policy::custom(move |attempt| {
        let leaves_origin = attempt
            .previous()
            .first()
            .is_some_and(|origin| !same_origin(attempt.url(), origin));
        if leaves_origin {
            attempt.stop()
        } else if attempt.previous().len() > max_redirects {
            attempt.error("too many redirects")
        } else {
            attempt.follow()
        }
    })
}

/// Classifies a transport failure.
fn network_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Network("Request timeout".to_string())
    } else if err.is_redirect() {
        BackendError::Network("Too many redirects".to_string())
    } else {
        BackendError::Network(err.to_string())
    }
}

/// Truncates text to at most `limit` characters.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[.. index].to_string(),
        None => text.to_string(),
    }
}

/// Returns the current time as RFC 3339.
fn now_rfc3339() -> String {
    OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default()
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Documentation backend adapter.
pub struct DocsBackend {
    /// Backend configuration.
    config: DocsConfig,
    /// Shared HTTP client.
    http: Client,
}

impl DocsBackend {
    /// Builds the backend and its HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Internal`] when the HTTP client cannot be built.
    pub fn new(config: DocsConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .redirect(redirect_policy(config.max_redirects))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| BackendError::Internal(format!("http client build failed: {err}")))?;
        Ok(Self {
            config,
            http,
        })
    }
}

/// Init arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitArgs {
    /// Base URL override.
    #[serde(default)]
    base_url: Option<String>,
}

/// Fetch arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchArgs {
    /// Search query.
    #[serde(default)]
    query: Option<String>,
    /// Page path or same-host URL.
    #[serde(default)]
    doc_path: Option<String>,
}

#[async_trait]
impl Backend for DocsBackend {
    type Client = DocsClient;
    type Tool = DocsTool;

    fn service_name(&self) -> &'static str {
        "Docs"
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        docs_descriptors()
    }

    async fn connect(&self, arguments: Value) -> Result<Connected<DocsClient>, BackendError> {
        let args: InitArgs = decode_arguments(arguments)?;
        let raw = args
            .base_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.config.base_url.clone());
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|err| BackendError::Validation(format!("invalid baseUrl: {err}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(BackendError::Validation("baseUrl must use http or https".to_string()));
        }
        let client = DocsClient {
            http: self.http.clone(),
            base_url,
            max_content_chars: self.config.max_content_chars,
        };
        let probe = client.resolve_url(None, None)?;
        client.fetch(probe).await?;
        let summary = ToolOutput::new(
            "Docs backend initialized successfully.",
            json!({"baseUrl": client.base_url().as_str()}),
        );
        Ok(Connected {
            client,
            summary,
        })
    }

    async fn call(
        &self,
        tool: DocsTool,
        client: &DocsClient,
        arguments: Value,
    ) -> Result<ToolOutput, BackendError> {
        match tool {
            DocsTool::Init => {
                Err(BackendError::Internal("init is handled by the session".to_string()))
            }
            DocsTool::Ping => Ok(ToolOutput::body(json!({
                "message": "pong",
                "timestamp": now_rfc3339(),
            }))),
            DocsTool::Search | DocsTool::GetBackstageDocs => {
                let args: FetchArgs = decode_arguments(arguments)?;
                let url = client.resolve_url(args.query.as_deref(), args.doc_path.as_deref())?;
                let page = client.fetch(url).await?;
                Ok(ToolOutput::body(json!({
                    "query": args.query.as_deref().unwrap_or("general"),
                    "docPath": args.doc_path,
                    "url": page.url,
                    "contentType": page.content_type,
                    "content": page.content,
                    "timestamp": now_rfc3339(),
                })))
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::use_debug,
        reason = "Test-only assertions are permitted."
    )]

    use toolgate_core::ToolRegistry;

    use super::*;

    fn client(base: &str) -> DocsClient {
        DocsClient {
            http: Client::new(),
            base_url: Url::parse(base).unwrap(),
            max_content_chars: 8,
        }
    }

    #[test]
    fn catalogue_matches_tool_enum() {
        let registry = ToolRegistry::build::<DocsTool>(docs_descriptors()).unwrap();
        assert!(registry.contains("context7.getBackstageDocs"));
        assert_eq!(DocsTool::parse("init_docs"), Some(DocsTool::Init));
        assert_eq!(DocsTool::parse("context7.ping"), Some(DocsTool::Ping));
    }

    #[test]
    fn urls_resolve_against_base() {
        let client = client("https://backstage.io");
        assert_eq!(client.resolve_url(None, None).unwrap().as_str(), "https://backstage.io/docs");
        assert_eq!(
            client.resolve_url(Some("plugins & more"), None).unwrap().as_str(),
            "https://backstage.io/docs/search?q=plugins+%26+more"
        );
        assert_eq!(
            client.resolve_url(Some("ignored"), Some("docs/overview")).unwrap().as_str(),
            "https://backstage.io/docs/overview"
        );
        assert_eq!(
            client.resolve_url(None, Some("https://backstage.io/docs/faq")).unwrap().as_str(),
            "https://backstage.io/docs/faq"
        );
    }

    #[test]
    fn foreign_hosts_are_rejected() {
        let client = client("https://backstage.io");
        let err = client.resolve_url(None, Some("https://evil.example/docs")).unwrap_err();
        assert_eq!(err.kind(), "validation");
        assert!(err.to_string().contains("evil.example"));

        let err = client.resolve_url(None, Some("http://backstage.io/docs")).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn scheme_relative_paths_cannot_leave_the_base_host() {
        let client = client("https://backstage.io");
        for path in ["//evil.example/steal", "/\\evil.example/steal", "\\\\evil.example/x"] {
            let result = client.resolve_url(None, Some(path));
            assert!(
                result.as_ref().is_err_and(|err| err.kind() == "validation"),
                "{path} resolved to {result:?}"
            );
        }
        assert_eq!(
            client.resolve_url(None, Some("/docs/a//b")).unwrap().as_str(),
            "https://backstage.io/docs/a//b"
        );
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 7), "héllo w");
        assert_eq!(truncate_chars("short", 50), "short");
        assert_eq!(truncate_chars("", 0), "");
    }
}
