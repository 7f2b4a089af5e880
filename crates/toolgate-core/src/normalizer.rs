// crates/toolgate-core/src/normalizer.rs
// ============================================================================
// Module: Response Normalizer
// Description: Renders handler outcomes into response envelopes.
// Purpose: Guarantee one envelope shape for success and failure alike.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Every dispatch outcome passes through this module exactly once. Structured
//! values render as pretty-printed JSON, raw strings render as-is, and errors
//! render as `"Error: <message>"` with `isError` set. A value that cannot be
//! rendered is itself reported as an error envelope.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::envelope::ResponseEnvelope;
use crate::envelope::ToolOutput;
use crate::error::GatewayError;

/// Fallback message when an error renders to an empty string.
const UNKNOWN_ERROR: &str = "unknown error";

/// Wraps a serializable value into a success envelope.
///
/// Falls back to an error envelope when serialization fails.
#[must_use]
pub fn wrap_success<T: Serialize + ?Sized>(value: &T) -> ResponseEnvelope {
    match render(value) {
        Ok(text) => ResponseEnvelope::success(text),
        Err(err) => wrap_error(&err),
    }
}

/// Wraps handler output (headline, body, footer) into a success envelope.
#[must_use]
pub fn wrap_output(output: &ToolOutput) -> ResponseEnvelope {
    let body = match render(&output.body) {
        Ok(body) => body,
        Err(err) => return wrap_error(&err),
    };
    let mut sections: Vec<&str> = Vec::with_capacity(3);
    if let Some(headline) = output.headline.as_deref() {
        sections.push(headline);
    }
    if !body.is_empty() {
        sections.push(&body);
    }
    if let Some(footer) = output.footer.as_deref() {
        sections.push(footer);
    }
    ResponseEnvelope::success(sections.join("\n\n"))
}

/// Wraps an error into an error envelope.
#[must_use]
pub fn wrap_error(error: &dyn fmt::Display) -> ResponseEnvelope {
    let message = error.to_string();
    let message = if message.trim().is_empty() { UNKNOWN_ERROR.to_string() } else { message };
    ResponseEnvelope::failure(format!("Error: {message}"))
}

/// Folds a dispatch result into an envelope.
#[must_use]
pub fn wrap_result(result: Result<ToolOutput, GatewayError>) -> ResponseEnvelope {
    match result {
        Ok(output) => wrap_output(&output),
        Err(err) => wrap_error(&err),
    }
}

/// Renders a value as envelope text.
fn render<T: Serialize + ?Sized>(value: &T) -> Result<String, GatewayError> {
    let value =
        serde_json::to_value(value).map_err(|err| GatewayError::Serialization(err.to_string()))?;
    match value {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        other => serde_json::to_string_pretty(&other)
            .map_err(|err| GatewayError::Serialization(err.to_string())),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn structured_values_render_pretty_json() {
        let envelope = wrap_success(&json!({"teams": [{"id": "T1"}]}));
        assert!(!envelope.is_error);
        let text = envelope.text().unwrap();
        assert!(text.contains("\n  \"teams\""));
        let parsed: Value = serde_json::from_str(text).unwrap();
        assert_eq!(parsed, json!({"teams": [{"id": "T1"}]}));
    }

    #[test]
    fn raw_strings_render_verbatim() {
        let envelope = wrap_success("pong");
        assert_eq!(envelope.text(), Some("pong"));
    }

    #[test]
    fn unserializable_values_become_error_envelopes() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "tuple keys are not valid JSON object keys");
        let envelope = wrap_success(&map);
        assert!(envelope.is_error);
        assert!(envelope.text().unwrap().starts_with("Error: Failed to serialize tool result"));
    }

    #[test]
    fn errors_carry_prefix_and_flag() {
        let envelope = wrap_error(&GatewayError::UnknownTool("foo".to_string()));
        assert!(envelope.is_error);
        assert_eq!(envelope.text(), Some("Error: Unknown tool: foo"));
    }

    #[test]
    fn empty_error_messages_fall_back() {
        let envelope = wrap_error(&GatewayError::Handler(String::new()));
        assert_eq!(envelope.text(), Some("Error: unknown error"));
    }

    #[test]
    fn output_joins_headline_body_and_footer() {
        let output = ToolOutput::new("Found 1 teams:", json!([{"id": "T1"}]))
            .with_footer("URL: https://example.test");
        let envelope = wrap_output(&output);
        let text = envelope.text().unwrap();
        assert!(text.starts_with("Found 1 teams:\n\n["));
        assert!(text.ends_with("]\n\nURL: https://example.test"));
    }

    #[test]
    fn message_output_has_no_body_section() {
        let envelope = wrap_output(&ToolOutput::message("Secret deleted"));
        assert_eq!(envelope.text(), Some("Secret deleted"));
    }

    #[test]
    fn success_wire_form_omits_is_error() {
        let wire = serde_json::to_value(ResponseEnvelope::success("ok".to_string())).unwrap();
        assert_eq!(wire, json!({"content": [{"type": "text", "text": "ok"}]}));
        let wire = serde_json::to_value(ResponseEnvelope::failure("Error: x".to_string())).unwrap();
        assert_eq!(wire["isError"], json!(true));
    }
}
