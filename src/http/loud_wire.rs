//! Wire-level debugging via the `LOUD_WIRE` environment variable.
//!
//! When `LOUD_WIRE` is set to any value, requests and responses are printed to
//! stderr with pretty formatting and colors.
//!
//! ```bash
//! LOUD_WIRE=1 cargo test --test client_tests
//! ```
//!
//! - Green `>>>` for outgoing requests, red `<<<` for responses
//! - `Authorization` values are redacted
//! - Multipart bodies are summarized by part, never dumped

use crate::multipart::MultipartForm;
use colored::Colorize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

static ENABLED: OnceLock<bool> = OnceLock::new();

/// Fields whose values are never printed.
const REDACTED_FIELDS: &[&str] = &["password", "token"];

/// Non-JSON bodies longer than this are cut.
const RAW_BODY_LIMIT: usize = 1000;

/// Check if LOUD_WIRE debugging is enabled.
///
/// Cached after the first check, so `LOUD_WIRE` must be set before the first request.
#[must_use]
pub fn is_enabled() -> bool {
    *ENABLED.get_or_init(|| std::env::var("LOUD_WIRE").is_ok())
}

/// Get the next request ID for correlation.
#[must_use]
pub fn next_request_id() -> usize {
    REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Replaces secret values in a JSON tree with `"***"`.
fn redact_secrets(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) && val.is_string() {
                    *val = serde_json::Value::String("***".to_string());
                } else {
                    redact_secrets(val);
                }
            }
        }
        serde_json::Value::Array(arr) => arr.iter_mut().for_each(redact_secrets),
        _ => {}
    }
}

/// Redacts the credential part of an `Authorization` header value.
pub(crate) fn redact_header(name: &str, value: &str) -> String {
    if name.eq_ignore_ascii_case("authorization") {
        match value.split_once(' ') {
            Some((scheme, _)) => format!("{scheme} ***"),
            None => "***".to_string(),
        }
    } else {
        value.to_string()
    }
}

fn prefix(request_id: usize) -> String {
    let ts = chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
        .dimmed();
    format!(
        "{} {} {}",
        "[LOUD_WIRE]".bold(),
        ts,
        format!("[REQ#{}]", request_id).cyan()
    )
}

fn print_json_or_raw(prefix: &str, label: &str, body: &[u8]) {
    if let Ok(mut parsed) = serde_json::from_slice::<serde_json::Value>(body) {
        redact_secrets(&mut parsed);
        eprintln!("{prefix} {label}:");
        let rendered = colored_json::to_colored_json_auto(&parsed)
            .ok()
            .or_else(|| serde_json::to_string_pretty(&parsed).ok());
        if let Some(rendered) = rendered {
            for line in rendered.lines() {
                eprintln!("{prefix} {line}");
            }
        }
    } else {
        let text = String::from_utf8_lossy(body);
        let truncated = crate::http::error_helpers::truncate_for_context(&text, RAW_BODY_LIMIT);
        eprintln!("{prefix} {label}: {truncated}");
    }
}

/// Log an outgoing HTTP request. Header values are redacted as they are printed.
pub fn log_request(
    request_id: usize,
    method: &str,
    url: &str,
    headers: &[(String, String)],
    json_body: Option<&[u8]>,
) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = ">>>".green().bold();
    eprintln!("{prefix} {direction} {method} {url}");

    for (name, value) in headers {
        eprintln!("{prefix} {}: {}", name.green(), redact_header(name, value));
    }

    if let Some(body) = json_body {
        print_json_or_raw(&prefix, &"Body".green().to_string(), body);
    }
}

/// Log a multipart body as a summary of its parts.
pub fn log_multipart(request_id: usize, form: &MultipartForm) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    for part in form.text_parts() {
        eprintln!("{prefix} {} {}={}", "Part".green(), part.field_name, part.value);
    }
    let file = form.file();
    let size_kb = file.bytes.len() as f64 / 1024.0;
    eprintln!(
        "{prefix} {} {} \"{}\" ({}, {size_kb:.1} KB)",
        "File".green().bold(),
        file.field_name,
        file.file_name,
        file.mime_type
    );
}

/// Log an incoming HTTP response status.
pub fn log_response_status(request_id: usize, status: u16) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    let direction = "<<<".red().bold();
    let status_text = match status {
        200..=299 => format!("{status} OK").green(),
        401 => format!("{status} SESSION EXPIRED").yellow(),
        _ => format!("{status} ERROR").red(),
    };

    eprintln!("{prefix} {direction} {status_text}");
}

/// Log an incoming HTTP response body.
pub fn log_response_body(request_id: usize, body: &[u8]) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    print_json_or_raw(&prefix, &"Response".red().to_string(), body);
}

/// Log a transport failure.
pub fn log_transport_error(request_id: usize, message: &str) {
    if !is_enabled() {
        return;
    }

    let prefix = prefix(request_id);
    eprintln!("{prefix} {} {}", "<<<".red().bold(), message.red());
}
