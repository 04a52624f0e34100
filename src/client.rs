use crate::errors::ClientError;
use crate::http::common::{Endpoint, construct_endpoint_url};
use crate::http::error_helpers::deserialize_with_context;
use crate::http::request;
use crate::image_host::{self, ImageFile, ImageHostConfig};
use crate::models::{Salon, SalonResponse, Service, ServiceResponse};
use crate::request::{ApiResult, Method, RequestIntent};
use crate::session::{SessionStore, SettingsStore};
use bytes::Bytes;
use chrono::NaiveTime;
use reqwest::Client as ReqwestClient;
use serde_json::{Map, Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable read by [`ClientBuilder::from_env`] for the API base URL.
pub const API_URL_ENV: &str = "QUICKCUTS_API_URL";
/// Environment variable read by [`ClientBuilder::from_env`] for the request timeout.
pub const TIMEOUT_ENV: &str = "QUICKCUTS_TIMEOUT_SECS";

/// Total request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Called after the session has been cleared because the backend answered 401.
pub type SessionExpiredHook = Arc<dyn Fn() + Send + Sync>;

/// Client for the salon admin API.
///
/// Cloning is cheap: clones share the connection pool and the [`SessionStore`].
#[derive(Clone)]
pub struct Client {
    pub(crate) base_url: String,
    #[allow(clippy::struct_field_names)]
    pub(crate) http_client: ReqwestClient,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) image_host: ImageHostConfig,
    on_session_expired: Option<SessionExpiredHook>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("session", &self.session)
            .field("image_host", &self.image_host)
            .field("on_session_expired", &self.on_session_expired.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for `Client` instances.
///
/// # Example
///
/// ```
/// use quickcuts_admin::Client;
/// use std::time::Duration;
///
/// let client = Client::builder("http://192.168.1.2:7700/api")
///     .timeout(Duration::from_secs(30))
///     .connect_timeout(Duration::from_secs(5))
///     .on_session_expired(|| println!("session expired, back to login"))
///     .build()
///     .unwrap();
/// assert!(!client.session().is_logged_in());
/// ```
pub struct ClientBuilder {
    base_url: String,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    image_host: ImageHostConfig,
    session: Option<Arc<SessionStore>>,
    settings: Option<Arc<dyn SettingsStore>>,
    on_session_expired: Option<SessionExpiredHook>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("image_host", &self.image_host)
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Reads the base URL from `QUICKCUTS_API_URL` and an optional timeout in
    /// whole seconds from `QUICKCUTS_TIMEOUT_SECS`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] if the URL is unset or the timeout
    /// is not a number.
    pub fn from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var(API_URL_ENV)
            .map_err(|_| ClientError::InvalidInput(format!("{API_URL_ENV} is not set")))?;
        let mut builder = Client::builder(base_url);

        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                ClientError::InvalidInput(format!("{TIMEOUT_ENV} must be whole seconds, got '{raw}'"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    /// Sets the total request timeout. Defaults to [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout. If not set, uses reqwest's default.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Overrides the image host upload target.
    #[must_use]
    pub fn image_host(mut self, config: ImageHostConfig) -> Self {
        self.image_host = config;
        self
    }

    /// Shares an existing session store with the client.
    ///
    /// Takes precedence over [`settings`](Self::settings).
    #[must_use]
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Restores (and persists) the session through `settings`.
    #[must_use]
    pub fn settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Registers a hook that runs after a 401 has cleared the session.
    #[must_use]
    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    /// Builds the `Client`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the HTTP client cannot be
    /// initialized (e.g., TLS backend failure).
    pub fn build(self) -> Result<Client, ClientError> {
        let mut builder =
            ReqwestClient::builder().timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT));

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let http_client = builder
            .build()
            .map_err(|e| ClientError::ClientBuild(e.to_string()))?;

        let session = match (self.session, self.settings) {
            (Some(session), _) => session,
            (None, Some(settings)) => Arc::new(SessionStore::load(settings)),
            (None, None) => Arc::new(SessionStore::in_memory()),
        };

        Ok(Client {
            base_url: self.base_url,
            http_client,
            session,
            image_host: self.image_host,
            on_session_expired: self.on_session_expired,
        })
    }
}

/// Data submitted when registering a new salon.
#[derive(Clone, PartialEq)]
pub struct SalonRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub address: String,
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Debug for SalonRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SalonRegistration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("address", &self.address)
            .field("opening_time", &self.opening_time)
            .field("closing_time", &self.closing_time)
            .field("latitude", &self.latitude)
            .field("longitude", &self.longitude)
            .finish()
    }
}

impl SalonRegistration {
    fn to_payload(&self) -> Value {
        json!({
            "name": self.name,
            "email": self.email,
            "password": self.password,
            "address": self.address,
            "operatingHours": {
                "start": self.opening_time.format("%H:%M").to_string(),
                "end": self.closing_time.format("%H:%M").to_string(),
            },
            "lat": self.latitude,
            "lon": self.longitude,
        })
    }
}

/// A catalog entry to create. `price` is sent as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewService {
    pub name: String,
    pub price: String,
    pub image: ImageFile,
}

impl NewService {
    fn validate(&self) -> Result<(), ClientError> {
        if self.name.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "Service name cannot be empty.".to_string(),
            ));
        }
        // Validated exactly as it will be sent.
        if !self
            .price
            .parse::<f64>()
            .is_ok_and(|price| price.is_finite())
        {
            return Err(ClientError::InvalidInput(
                "Invalid price. Please enter a valid number.".to_string(),
            ));
        }
        Ok(())
    }
}

impl Client {
    /// Creates a new builder for `Client` instances.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API root, including the `/api` prefix.
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ClientBuilder {
        ClientBuilder {
            base_url: base_url.into(),
            timeout: None,
            connect_timeout: None,
            image_host: ImageHostConfig::default(),
            session: None,
            settings: None,
            on_session_expired: None,
        }
    }

    /// Creates a client with default settings and an in-memory session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ClientBuild`] if the HTTP client cannot be initialized.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder(base_url).build()
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of `endpoint` under this client's base URL.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint<'_>) -> String {
        construct_endpoint_url(&self.base_url, endpoint)
    }

    /// Sends `intent` with the session's bearer token.
    ///
    /// On 401 the session is cleared and the [`on_session_expired`] hook runs
    /// before [`ApiResult::AuthExpired`] is returned.
    ///
    /// The request runs on its own tokio task. Dropping the returned future
    /// does not cancel it, so the session side effects of a response still
    /// happen after the caller loses interest.
    ///
    /// [`on_session_expired`]: ClientBuilder::on_session_expired
    pub async fn send(&self, intent: RequestIntent) -> ApiResult {
        let http_client = self.http_client.clone();
        let session = Arc::clone(&self.session);
        let hook = self.on_session_expired.clone();

        let task = tokio::spawn(async move {
            let expired = Arc::clone(&session);
            request::send(&http_client, &session, intent, move || {
                info!("Session expired; clearing stored credentials");
                expired.clear();
                if let Some(hook) = hook {
                    hook();
                }
            })
            .await
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Request task failed: {}", e);
                ApiResult::TransportError(format!("request task failed: {e}"))
            }
        }
    }

    async fn call(
        &self,
        method: Method,
        endpoint: Endpoint<'_>,
        body: Option<Value>,
    ) -> Result<Bytes, ClientError> {
        if endpoint.requires_auth() {
            self.require_session()?;
        }

        let mut intent = RequestIntent::new(method, self.endpoint_url(endpoint));
        if let Some(body) = body {
            intent = intent.with_json(body);
        }
        self.send(intent).await.into_result()
    }

    fn require_session(&self) -> Result<(), ClientError> {
        if self.session.is_logged_in() {
            Ok(())
        } else {
            Err(ClientError::NotLoggedIn(
                "Authorization token not found. Please log in again.".to_string(),
            ))
        }
    }

    fn cached_salon_id(&self) -> Result<String, ClientError> {
        self.session
            .profile()
            .and_then(|salon| salon.id)
            .ok_or_else(|| {
                ClientError::NotLoggedIn("Salon ID not found. Please log in again.".to_string())
            })
    }

    /// Uploads an image to the configured image host and returns its URL.
    ///
    /// # Errors
    ///
    /// See [`image_host::upload_image`].
    pub async fn upload_image(&self, image: ImageFile) -> Result<String, ClientError> {
        image_host::upload_image(&self.http_client, &self.image_host, image).await
    }

    /// Registers a new salon.
    ///
    /// If the backend answers with both a token and a salon, the client is
    /// logged in as that salon.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend rejects it.
    pub async fn register_salon(&self, registration: &SalonRegistration) -> Result<(), ClientError> {
        debug!("Registering salon: {:?}", registration);
        let bytes = self
            .call(
                Method::Post,
                Endpoint::Register,
                Some(registration.to_payload()),
            )
            .await?;

        if let Ok(response) = serde_json::from_slice::<SalonResponse>(&bytes)
            && let (Some(token), Some(salon)) = (response.token, response.salon)
        {
            self.session.set_profile(salon);
            self.session.set_session(token);
            debug!("Registration returned a session; logged in");
        }

        info!("Salon registered");
        Ok(())
    }

    /// Logs in and returns the salon profile, which is also cached in the session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`] if the response lacks a token
    /// or salon, [`ClientError::Decode`] if it is not a `SalonResponse`, and
    /// transport/server errors as usual.
    pub async fn login(&self, email: &str, password: &str) -> Result<Salon, ClientError> {
        let bytes = self
            .call(
                Method::Post,
                Endpoint::Login,
                Some(json!({"email": email, "password": password})),
            )
            .await?;

        let response: SalonResponse = deserialize_with_context(&bytes, "SalonResponse from login")?;
        match (response.token, response.salon) {
            (Some(token), Some(salon)) => {
                self.session.set_profile(salon.clone());
                self.session.set_session(token);
                info!("Logged in as salon {:?}", salon.id);
                Ok(salon)
            }
            _ => Err(ClientError::MalformedResponse(
                "login response is missing the token or salon".to_string(),
            )),
        }
    }

    /// Logs out on the backend and clears the local session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] when no profile is cached. On any
    /// other failure the local session is kept (except after a 401, which
    /// always clears it).
    pub async fn logout(&self) -> Result<(), ClientError> {
        let salon_id = self.cached_salon_id()?;
        self.call(
            Method::Post,
            Endpoint::Logout,
            Some(json!({"salonId": salon_id})),
        )
        .await?;

        self.session.clear();
        info!("Salon logged out");
        Ok(())
    }

    /// Fetches the logged-in salon's profile and caches it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedResponse`] if the response has no salon.
    pub async fn fetch_profile(&self) -> Result<Salon, ClientError> {
        let bytes = self.call(Method::Get, Endpoint::Profile, None).await?;
        let response: SalonResponse =
            deserialize_with_context(&bytes, "SalonResponse from profile")?;
        let salon = response.salon.ok_or_else(|| {
            ClientError::MalformedResponse("profile response has no salon".to_string())
        })?;

        self.session.set_profile(salon.clone());
        Ok(salon)
    }

    /// Lists the services of the cached salon.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] when no salon id is cached and
    /// [`ClientError::MalformedResponse`] unless the backend reports `success: true`.
    pub async fn fetch_services(&self) -> Result<Vec<Service>, ClientError> {
        let salon_id = self.cached_salon_id()?;
        let bytes = self
            .call(
                Method::Get,
                Endpoint::SalonServices {
                    salon_id: &salon_id,
                },
                None,
            )
            .await?;

        let response: ServiceResponse = deserialize_with_context(&bytes, "ServiceResponse")?;
        if response.success != Some(true) {
            return Err(ClientError::MalformedResponse(
                "Failed to fetch services: unexpected response".to_string(),
            ));
        }

        let services = response.data.unwrap_or_default();
        debug!("Fetched {} services for salon {}", services.len(), salon_id);
        Ok(services)
    }

    /// Uploads `image` and makes it the salon's main picture. Returns the new URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NotLoggedIn`] without a stored token (before
    /// uploading), then image host errors, then the usual backend errors.
    pub async fn update_main_picture(&self, image: ImageFile) -> Result<String, ClientError> {
        self.require_session()?;
        let url = self.upload_image(image).await?;
        self.call(
            Method::Put,
            Endpoint::MainPicture,
            Some(json!({"mainPicture": url})),
        )
        .await?;

        let mut updates = Map::new();
        updates.insert("mainPicture".to_string(), Value::String(url.clone()));
        self.session.update_profile(updates)?;
        Ok(url)
    }

    /// Uploads the service image and creates the service.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidInput`] for an empty name or non-numeric
    /// price and [`ClientError::NotLoggedIn`] without a stored token, before
    /// anything is uploaded.
    pub async fn add_service(&self, service: NewService) -> Result<(), ClientError> {
        service.validate()?;
        self.require_session()?;

        let image_url = self.upload_image(service.image).await?;
        self.call(
            Method::Post,
            Endpoint::CreateService,
            Some(json!({
                "name": service.name,
                "price": service.price,
                "serviceImage": image_url,
            })),
        )
        .await?;

        info!("Service '{}' added", service.name);
        Ok(())
    }
}
