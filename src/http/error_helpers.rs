//! Helpers for turning response bodies into messages and typed records.

use crate::errors::ClientError;
use serde::de::DeserializeOwned;

/// Maximum characters to include from a body in error context messages
const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

/// Extracts a user-facing message from an error response body.
///
/// Uses the body's top-level JSON `message` string when present, otherwise
/// falls back to a generic message naming the status code.
#[must_use]
pub fn display_message(status_code: u16, body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_string))
        .unwrap_or_else(|| format!("Server error with status code {status_code}."))
}

/// Decodes `body` as `T`, reporting failures as [`ClientError::Decode`] with a body preview.
///
/// # Errors
///
/// Returns [`ClientError::Decode`] if the body is not valid JSON for `T`.
pub fn deserialize_with_context<T: DeserializeOwned>(
    body: &[u8],
    context: &str,
) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::Decode {
        context: context.to_string(),
        message: format_json_parse_error(&String::from_utf8_lossy(body), e),
    })
}

/// Formats JSON parsing context by including a preview of the raw JSON.
pub fn format_json_parse_error(json_str: &str, error: serde_json::Error) -> String {
    let preview = truncate_for_context(json_str, ERROR_BODY_PREVIEW_LENGTH);
    format!("{} | Context: {}", error, preview)
}

/// Truncates a string to specified length, adding "..." if truncated.
///
/// Uses character-boundary-aware slicing to prevent panics on multi-byte UTF-8 characters.
pub(crate) fn truncate_for_context(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let truncate_at = s
            .char_indices()
            .take_while(|(i, c)| i + c.len_utf8() <= max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &s[..truncate_at])
    }
}
