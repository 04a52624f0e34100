//! The authenticated request path: header assembly, body selection, sending
//! and status classification.

use super::common::{AUTHORIZATION_HEADER, JSON_CONTENT_TYPE};
use super::loud_wire;
use crate::multipart::{self, MultipartForm};
use crate::request::{ApiResult, Method, RequestIntent};
use crate::session::SessionStore;
use bytes::Bytes;
use reqwest::Client as ReqwestClient;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::panic::{AssertUnwindSafe, catch_unwind};
use tracing::{debug, warn};

/// A request with its final headers and encoded body.
#[derive(Debug)]
pub(crate) struct PreparedRequest {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Vec<u8>>,
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), String> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| format!("invalid header name '{name}': {e}"))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| format!("invalid value for header '{name}': {e}"))?;
    Ok((header_name, header_value))
}

/// Builds the final headers and body for `intent`.
///
/// Headers are layered: content type, then bearer token, then caller headers,
/// with later layers replacing earlier ones (names compare case-insensitively).
/// A multipart body wins over a JSON body; with neither, no body is sent.
pub(crate) fn prepare(
    intent: RequestIntent,
    token: Option<&str>,
) -> Result<PreparedRequest, String> {
    let mut headers = HeaderMap::new();

    let (content_type, body) = match (intent.multipart_body(), intent.json_body()) {
        (Some(form), _) => {
            let boundary = form.pick_boundary();
            (
                MultipartForm::content_type(&boundary),
                Some(multipart::encode(form, &boundary)),
            )
        }
        (None, Some(json)) => {
            let encoded = serde_json::to_vec(json)
                .map_err(|e| format!("failed to encode JSON body: {e}"))?;
            (JSON_CONTENT_TYPE.to_string(), Some(encoded))
        }
        (None, None) => (JSON_CONTENT_TYPE.to_string(), None),
    };

    let (name, value) = header_pair(CONTENT_TYPE.as_str(), &content_type)?;
    headers.insert(name, value);

    if let Some(token) = token {
        let (name, value) = header_pair(AUTHORIZATION_HEADER, &format!("Bearer {token}"))?;
        headers.insert(name, value);
    }

    for (name, value) in intent.headers() {
        let (name, value) = header_pair(name, value)?;
        headers.insert(name, value);
    }

    Ok(PreparedRequest {
        method: intent.method(),
        url: intent.url().to_string(),
        headers,
        body,
    })
}

/// Maps a status code and body to an [`ApiResult`], running `on_auth_expired` on 401.
///
/// The callback runs at most once, before this returns. A panic inside it is
/// caught and logged so the caller still receives [`ApiResult::AuthExpired`].
pub(crate) fn classify<F>(status: u16, body: Result<Bytes, String>, on_auth_expired: F) -> ApiResult
where
    F: FnOnce(),
{
    match status {
        200..=299 => match body {
            Ok(bytes) if bytes.is_empty() => ApiResult::TransportError("no data".to_string()),
            Ok(bytes) => ApiResult::Success(bytes),
            Err(message) => ApiResult::TransportError(message),
        },
        401 => {
            if catch_unwind(AssertUnwindSafe(on_auth_expired)).is_err() {
                warn!("Session-expiry callback panicked; returning AuthExpired anyway");
            }
            ApiResult::AuthExpired
        }
        _ => ApiResult::ServerError(status, body.unwrap_or_default()),
    }
}

/// Sends `intent`, authenticating with the token held by `session`.
///
/// On HTTP 401, `on_auth_expired` is invoked synchronously before returning
/// [`ApiResult::AuthExpired`]. It does not clear `session` by itself; wire the
/// callback to do so (as [`Client::send`](crate::Client::send) does).
///
/// Nothing is retried. Transport failures, including a 2xx response without
/// a body, become [`ApiResult::TransportError`].
pub async fn send<F>(
    http_client: &ReqwestClient,
    session: &SessionStore,
    intent: RequestIntent,
    on_auth_expired: F,
) -> ApiResult
where
    F: FnOnce(),
{
    let request_id = loud_wire::next_request_id();
    let multipart_form = if loud_wire::is_enabled() {
        intent.multipart_body().cloned()
    } else {
        None
    };

    let (token, logged_in) = session.snapshot();
    let prepared = match prepare(intent, token.as_deref()) {
        Ok(prepared) => prepared,
        Err(message) => {
            warn!("Request not sent: {}", message);
            return ApiResult::TransportError(message);
        }
    };

    debug!(
        "{} {} (token: {}, logged_in: {})",
        prepared.method,
        prepared.url,
        token.is_some(),
        logged_in
    );

    if loud_wire::is_enabled() {
        let headers: Vec<(String, String)> = prepared
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or("<binary>").to_string(),
                )
            })
            .collect();
        let json_body = if multipart_form.is_none() {
            prepared.body.as_deref()
        } else {
            None
        };
        loud_wire::log_request(
            request_id,
            prepared.method.as_str(),
            &prepared.url,
            &headers,
            json_body,
        );
        if let Some(form) = &multipart_form {
            loud_wire::log_multipart(request_id, form);
        }
    }

    let mut builder = http_client
        .request(prepared.method.into(), prepared.url.as_str())
        .headers(prepared.headers);
    if let Some(body) = prepared.body {
        builder = builder.body(body);
    }

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            let message = e.to_string();
            warn!("Transport error for {}: {}", prepared.url, message);
            loud_wire::log_transport_error(request_id, &message);
            return ApiResult::TransportError(message);
        }
    };

    let status = response.status().as_u16();
    loud_wire::log_response_status(request_id, status);

    let body = response.bytes().await.map_err(|e| e.to_string());
    if let Ok(bytes) = &body
        && !bytes.is_empty()
    {
        loud_wire::log_response_body(request_id, bytes);
    }

    let result = classify(status, body, on_auth_expired);
    debug!("{} {} -> HTTP {}", prepared.method, prepared.url, status);
    result
}
