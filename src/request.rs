//! Request intents and response classification.

use crate::errors::ClientError;
use crate::http::error_helpers::display_message;
use crate::multipart::MultipartForm;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// HTTP methods used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Everything needed to issue one request.
///
/// Built with the `with_*` methods and then handed by value to
/// [`send`](crate::http::request::send) or [`Client::send`](crate::Client::send).
/// A multipart body takes precedence over a JSON body. A body is sent for any
/// method when one is supplied, GET included.
///
/// # Example
///
/// ```
/// use quickcuts_admin::{Method, RequestIntent};
/// use serde_json::json;
///
/// let intent = RequestIntent::post("http://localhost:7700/api/auth/salon/login")
///     .with_json(json!({"email": "owner@fade.st", "password": "hunter2"}))
///     .with_header("X-Client", "admin-app");
///
/// assert_eq!(intent.method(), Method::Post);
/// assert!(intent.json_body().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RequestIntent {
    url: String,
    method: Method,
    headers: BTreeMap<String, String>,
    json_body: Option<Map<String, Value>>,
    multipart_body: Option<MultipartForm>,
}

impl RequestIntent {
    #[must_use]
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: BTreeMap::new(),
            json_body: None,
            multipart_body: None,
        }
    }

    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    #[must_use]
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::Post, url)
    }

    #[must_use]
    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::Put, url)
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url)
    }

    /// Adds a caller header. Caller headers override the defaults on collision.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    ///
    /// Non-object values are ignored with a warning: the backend only accepts
    /// JSON objects.
    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        match body {
            Value::Object(map) => self.json_body = Some(map),
            other => tracing::warn!("Ignoring non-object JSON body: {}", other),
        }
        self
    }

    #[must_use]
    pub fn with_json_map(mut self, body: Map<String, Value>) -> Self {
        self.json_body = Some(body);
        self
    }

    #[must_use]
    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.multipart_body = Some(form);
        self
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn json_body(&self) -> Option<&Map<String, Value>> {
        self.json_body.as_ref()
    }

    #[must_use]
    pub fn multipart_body(&self) -> Option<&MultipartForm> {
        self.multipart_body.as_ref()
    }
}

/// Outcome of one request, classified by status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult {
    /// 2xx with a non-empty body.
    Success(Bytes),
    /// 401. The expiry callback has already run.
    AuthExpired,
    /// Any other status, with the body (possibly empty).
    ServerError(u16, Bytes),
    /// The request never produced a usable response.
    TransportError(String),
}

impl ApiResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// A user-facing message for non-success outcomes.
    ///
    /// For server errors this is the body's JSON `message` field when present,
    /// otherwise a generic message naming the status code.
    #[must_use]
    pub fn display_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::AuthExpired => Some("Session expired. Please log in again.".to_string()),
            Self::ServerError(status, body) => Some(display_message(*status, body)),
            Self::TransportError(message) => Some(message.clone()),
        }
    }

    /// Converts into the typed error surface used by [`Client`](crate::Client) operations.
    ///
    /// # Errors
    ///
    /// Returns the [`ClientError`] matching every non-success variant.
    pub fn into_result(self) -> Result<Bytes, ClientError> {
        match self {
            Self::Success(bytes) => Ok(bytes),
            Self::AuthExpired => Err(ClientError::AuthExpired),
            Self::ServerError(status_code, body) => Err(ClientError::Server {
                status_code,
                message: display_message(status_code, &body),
                body,
            }),
            Self::TransportError(message) => Err(ClientError::Transport(message)),
        }
    }
}
