// crates/toolgate-core/src/envelope.rs
// ============================================================================
// Module: Response Envelope
// Description: Uniform tool response shape and handler output payloads.
// Purpose: Define the `{content, isError}` envelope every tool call produces.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`ResponseEnvelope`] is the single shape returned for every tool call,
//! successful or not. [`ToolOutput`] is what handlers hand back before the
//! normalizer renders it into an envelope.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Tool output content block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Human-readable text output.
    Text {
        /// Text payload.
        text: String,
    },
}

/// Uniform response envelope for tool calls.
///
/// # Invariants
/// - `is_error == true` implies `content` holds exactly one error message.
/// - `isError` is omitted from the wire form on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Ordered content blocks.
    pub content: Vec<ContentBlock>,
    /// True when the call failed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ResponseEnvelope {
    /// Builds a successful single-text envelope.
    #[must_use]
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text,
            }],
            is_error: false,
        }
    }

    /// Builds a failed single-text envelope.
    #[must_use]
    pub fn failure(text: String) -> Self {
        Self {
            content: vec![ContentBlock::Text {
                text,
            }],
            is_error: true,
        }
    }

    /// Returns the first text block, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.first().map(|block| match block {
            ContentBlock::Text {
                text,
            } => text.as_str(),
        })
    }
}

/// Serde predicate that omits `isError` when false.
#[allow(clippy::trivially_copy_pass_by_ref, reason = "serde skip predicates take references.")]
const fn is_false(value: &bool) -> bool {
    !*value
}

// ============================================================================
// SECTION: Handler Output
// ============================================================================

/// Structured handler result prior to normalization.
///
/// Rendered as `headline`, a blank line, the pretty-printed `body`, and an
/// optional trailing `footer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Optional summary line.
    pub headline: Option<String>,
    /// Structured payload.
    pub body: Value,
    /// Optional trailing note.
    pub footer: Option<String>,
}

impl ToolOutput {
    /// Creates output with a headline and structured body.
    #[must_use]
    pub fn new(headline: impl Into<String>, body: Value) -> Self {
        Self {
            headline: Some(headline.into()),
            body,
            footer: None,
        }
    }

    /// Creates output with only a structured body.
    #[must_use]
    pub const fn body(body: Value) -> Self {
        Self {
            headline: None,
            body,
            footer: None,
        }
    }

    /// Creates text-only output.
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            headline: Some(text.into()),
            body: Value::Null,
            footer: None,
        }
    }

    /// Appends a trailing note.
    #[must_use]
    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}
