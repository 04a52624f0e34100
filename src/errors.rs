use thiserror::Error;

/// Defines errors that can occur when talking to the salon backend or the image host.
///
/// # Example: Handling Session Errors
///
/// ```ignore
/// match client.fetch_services().await {
///     Err(e) if e.is_session_error() => {
///         tracing::info!("session gone, showing login");
///     }
///     Err(ClientError::Server { status_code, message, .. }) => {
///         tracing::error!("backend error {}: {}", status_code, message);
///     }
///     // ...
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network-level failure: connection, DNS, TLS, timeout, or a 2xx without a body.
    #[error("Transport error: {0}")]
    Transport(String),
    /// The backend answered 401. The session has already been cleared.
    #[error("Session expired")]
    AuthExpired,
    /// Any non-2xx, non-401 response from the backend.
    #[error("Server error (HTTP {status_code}): {message}")]
    Server {
        /// HTTP status code (e.g., 400, 404, 500)
        status_code: u16,
        /// Display message extracted from the body's `message` field, or a generic fallback
        message: String,
        /// Raw response body, possibly empty
        body: bytes::Bytes,
    },
    /// A response body could not be decoded into the record the caller expected.
    #[error("Failed to decode {context}: {message}")]
    Decode {
        /// What was being decoded (e.g., "SalonResponse from login")
        context: String,
        /// Parser error with a preview of the offending body
        message: String,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// The response decoded fine but lacked data the operation needs.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    /// The image host did not answer with exactly HTTP 200.
    #[error("Image upload failed (HTTP {status_code})")]
    ImageHost { status_code: u16 },
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The operation needs a stored session (token or cached profile) and none exists.
    #[error("Not logged in: {0}")]
    NotLoggedIn(String),
    /// Failed to build the HTTP client.
    ///
    /// This typically only occurs in exceptional circumstances such as
    /// TLS backend initialization failures.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl ClientError {
    /// Returns `true` if the caller should route the user back to the login screen.
    ///
    /// ```rust
    /// use quickcuts_admin::ClientError;
    ///
    /// assert!(ClientError::AuthExpired.is_session_error());
    /// assert!(ClientError::NotLoggedIn("no token".into()).is_session_error());
    /// assert!(!ClientError::Transport("reset".into()).is_session_error());
    /// ```
    #[must_use]
    pub fn is_session_error(&self) -> bool {
        matches!(self, ClientError::AuthExpired | ClientError::NotLoggedIn(_))
    }

    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::AuthExpired => Some(401),
            ClientError::Server { status_code, .. } | ClientError::ImageHost { status_code } => {
                Some(*status_code)
            }
            _ => None,
        }
    }
}
