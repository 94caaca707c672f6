//! Normalized API error details and error envelope parsing.
//!
//! Completion endpoints disagree on how failures look on the wire:
//! - Nested: `{"error": {"message": "...", "type": "...", "param": "...", "code": "..."}}`
//! - Flat (Azure gateway): `{"statusCode": 401, "message": "..."}`
//!
//! [`parse_error_details`] probes the shapes in order and falls back to
//! [`ErrorDetails::default_error`] when nothing yields a usable message.
//! It never fails — the listener contract is the only failure channel, so
//! decode problems must not escape as errors themselves.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// Message surfaced when an error payload cannot be decoded.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Normalized error reported through
/// [`CompletionEventListener::on_error`](crate::CompletionEventListener::on_error).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorDetails {
    /// Human-readable error message.
    pub message: String,
    /// Provider error type (e.g. `"invalid_request_error"`).
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    /// Request parameter the error refers to.
    #[serde(default)]
    pub param: Option<String>,
    /// Provider-specific error code.
    #[serde(default)]
    pub code: Option<String>,
}

impl ErrorDetails {
    /// Error with a message only.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            param: None,
            code: None,
        }
    }

    /// The process-wide fallback error.
    #[must_use]
    pub fn default_error() -> Self {
        Self::from_message(DEFAULT_ERROR_MESSAGE)
    }
}

/// Parse an error response body into [`ErrorDetails`].
///
/// Shapes are probed in order of specificity; a shape only wins if it
/// yields a non-empty message:
/// 1. Nested envelope: `{"error": {message, type?, param?, code?}}`
/// 2. Flat: `{"statusCode"?, "message", "code"?}`
/// 3. [`ErrorDetails::default_error`]
pub fn parse_error_details(body: &str) -> ErrorDetails {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        // Nested envelope
        if let Some(error) = json.get("error") {
            if let Ok(details) = serde_json::from_value::<ErrorDetails>(error.clone()) {
                if !details.message.is_empty() {
                    return details;
                }
            }
        }

        // Flat shape: {"statusCode": 401, "message": "..."} or {"message", "code"}
        if let Some(message) = json["message"].as_str() {
            if !message.is_empty() {
                let code = json["code"]
                    .as_str()
                    .map(String::from)
                    .or_else(|| json["statusCode"].as_u64().map(|s| s.to_string()));
                return ErrorDetails {
                    message: message.to_string(),
                    error_type: json["type"].as_str().map(String::from),
                    param: None,
                    code,
                };
            }
        }
    }

    debug!(body_len = body.len(), "Unrecognized error payload, using fallback");
    ErrorDetails::default_error()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_envelope() {
        let body = r#"{"error":{"message":"Resource not found","code":"404"}}"#;
        let details = parse_error_details(body);
        assert_eq!(details.message, "Resource not found");
        assert_eq!(details.code.as_deref(), Some("404"));
        assert!(details.error_type.is_none());
        assert!(details.param.is_none());
    }

    #[test]
    fn nested_envelope_all_fields() {
        let body = r#"{"error":{"message":"bad param","type":"invalid_request_error","param":"temperature","code":"invalid_value"}}"#;
        let details = parse_error_details(body);
        assert_eq!(details.message, "bad param");
        assert_eq!(details.error_type.as_deref(), Some("invalid_request_error"));
        assert_eq!(details.param.as_deref(), Some("temperature"));
        assert_eq!(details.code.as_deref(), Some("invalid_value"));
    }

    #[test]
    fn nested_envelope_ignores_unknown_fields() {
        let body = r#"{"error":{"message":"oops","innererror":{"code":"x"}}}"#;
        assert_eq!(parse_error_details(body).message, "oops");
    }

    #[test]
    fn flat_status_code_shape() {
        let body = r#"{"statusCode":401,"message":"Token is invalid"}"#;
        let details = parse_error_details(body);
        assert_eq!(details.message, "Token is invalid");
        assert_eq!(details.code.as_deref(), Some("401"));
    }

    #[test]
    fn flat_message_code_shape() {
        let body = r#"{"message":"Invalid model","code":"model_not_found"}"#;
        let details = parse_error_details(body);
        assert_eq!(details.message, "Invalid model");
        assert_eq!(details.code.as_deref(), Some("model_not_found"));
    }

    #[test]
    fn nested_preferred_over_flat() {
        let body = r#"{"message":"outer","error":{"message":"inner"}}"#;
        assert_eq!(parse_error_details(body).message, "inner");
    }

    #[test]
    fn empty_nested_message_falls_through_to_flat() {
        let body = r#"{"error":{"message":""},"message":"flat wins"}"#;
        assert_eq!(parse_error_details(body).message, "flat wins");
    }

    #[test]
    fn unrecognized_json_uses_fallback() {
        let details = parse_error_details(r#"{"choices":[]}"#);
        assert_eq!(details.message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn empty_error_object_uses_fallback() {
        let details = parse_error_details(r#"{"error":{}}"#);
        assert_eq!(details.message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn non_json_body_uses_fallback() {
        assert_eq!(parse_error_details("Bad Gateway").message, DEFAULT_ERROR_MESSAGE);
        assert_eq!(parse_error_details("").message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn default_error_constant() {
        let details = ErrorDetails::default_error();
        assert_eq!(details.message, DEFAULT_ERROR_MESSAGE);
        assert!(details.error_type.is_none());
        assert!(details.param.is_none());
        assert!(details.code.is_none());
    }
}
