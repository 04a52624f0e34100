//! Client for the QuickCuts salon admin backend.
//!
//! Every backend call goes through one authenticated request path: the stored
//! bearer token is attached, the response is classified into an [`ApiResult`],
//! and a 401 clears the session and notifies the app so it can return to login.
//!
//! ```no_run
//! use quickcuts_admin::{Client, ClientError, JsonFileSettings};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), ClientError> {
//! let settings = JsonFileSettings::open("session.json").expect("settings file");
//! let client = Client::builder("http://192.168.1.2:7700/api")
//!     .settings(Arc::new(settings))
//!     .on_session_expired(|| eprintln!("please log in again"))
//!     .build()?;
//!
//! if !client.session().is_logged_in() {
//!     client.login("owner@fade.st", "hunter2").await?;
//! }
//! for service in client.fetch_services().await? {
//!     println!("{:?} {:?}", service.name, service.price);
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod errors;
pub mod http;
pub mod image_host;
pub mod models;
pub mod multipart;
mod request;
pub mod session;

pub use client::{
    API_URL_ENV, Client, ClientBuilder, DEFAULT_TIMEOUT, NewService, SalonRegistration,
    SessionExpiredHook, TIMEOUT_ENV,
};
pub use errors::ClientError;
pub use http::common::{Endpoint, construct_endpoint_url};
pub use http::error_helpers::display_message;
pub use image_host::{ImageFile, ImageHostConfig, upload_image};
pub use models::{Location, OperatingHours, Salon, SalonResponse, Service, ServiceResponse};
pub use multipart::{FilePart, MultipartForm, TextPart, encode, generate_boundary};
pub use request::{ApiResult, Method, RequestIntent};
pub use session::{
    JsonFileSettings, MemorySettings, SessionStore, SettingsError, SettingsStore,
};
