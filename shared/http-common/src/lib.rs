//! Shared HTTP utilities for the URL resource workspace.
//!
//! Provides common response builders, escaping and time utilities used by
//! api-server.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

// ============================================================================
// JSON Response Helpers (framework-agnostic)
// ============================================================================

/// Create a structured error JSON with a default message based on the code.
///
/// Returns: `{"error": {"code": "<code>", "message": "<default message>"}}`
pub fn json_err(code: &str) -> serde_json::Value {
    let message = match code {
        "not_found" => "Resource not found",
        "bad_request" => "Bad request",
        "invalid_url" => "Invalid URL",
        "error" | "internal" => "Internal server error",
        _ => code, // Fallback to code as message for unknown codes
    };
    serde_json::json!({"error": {"code": code, "message": message}})
}

/// Create a structured error JSON with a custom message.
///
/// Returns: `{"error": {"code": "<code>", "message": "<message>"}}`
pub fn json_error_with_message(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({"error": {"code": code, "message": message}})
}

// ============================================================================
// HTML Escaping
// ============================================================================

/// Escape text for HTML body or attribute context.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

// ============================================================================
// Time Utilities
// ============================================================================

/// Convert unix seconds to an RFC3339 string (seconds precision, UTC).
/// Used for the human-readable timestamp companions in API payloads.
pub fn unix_secs_to_rfc3339(secs: u64) -> String {
    let dt: DateTime<Utc> = Utc
        .timestamp_opt(secs as i64, 0)
        .single()
        .unwrap_or_default();
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_err_known_codes() {
        let v = json_err("not_found");
        assert_eq!(v["error"]["code"], "not_found");
        assert_eq!(v["error"]["message"], "Resource not found");
        let v = json_err("invalid_url");
        assert_eq!(v["error"]["message"], "Invalid URL");
    }

    #[test]
    fn json_err_unknown_code_falls_back() {
        let v = json_err("weird");
        assert_eq!(v["error"]["message"], "weird");
    }

    #[test]
    fn html_escape_covers_attribute_context() {
        assert_eq!(html_escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;");
    }

    #[test]
    fn formats_unix_seconds_as_rfc3339() {
        assert_eq!(unix_secs_to_rfc3339(0), "1970-01-01T00:00:00Z");
        assert_eq!(unix_secs_to_rfc3339(1_704_067_200), "2024-01-01T00:00:00Z");
    }
}
