//! Common test utilities shared across all integration test files.
//!
//! Usage in test files:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use quickcuts_admin::models::Salon;
use quickcuts_admin::{Client, ImageHostConfig};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::MockServer;

/// Token stored by [`logged_in_client`].
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-token";

/// Salon id cached by [`logged_in_client`].
#[allow(dead_code)]
pub const TEST_SALON_ID: &str = "salon-1";

/// Default timeout for tests that wait on background work.
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Image host config pointing at `server`'s `/image/upload`.
#[allow(dead_code)]
pub fn image_host_for(server: &MockServer) -> ImageHostConfig {
    ImageHostConfig {
        upload_url: format!("{}/image/upload", server.uri()),
        ..ImageHostConfig::default()
    }
}

/// A logged-out client whose backend and image host are both `server`.
#[allow(dead_code)]
pub fn client_for(server: &MockServer) -> Client {
    Client::builder(format!("{}/api", server.uri()))
        .image_host(image_host_for(server))
        .build()
        .expect("client should build")
}

/// Like [`client_for`], with a session hook counting its invocations.
#[allow(dead_code)]
pub fn client_with_counter(server: &MockServer) -> (Client, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let client = Client::builder(format!("{}/api", server.uri()))
        .image_host(image_host_for(server))
        .on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .expect("client should build");
    (client, calls)
}

/// Marks `client` as logged in with [`TEST_TOKEN`] and a cached profile.
#[allow(dead_code)]
pub fn log_in(client: &Client) {
    client.session().set_profile(Salon {
        id: Some(TEST_SALON_ID.to_string()),
        name: Some("Fade Street".to_string()),
        ..Salon::default()
    });
    client.session().set_session(TEST_TOKEN);
}

/// A client already logged in as [`TEST_SALON_ID`].
#[allow(dead_code)]
pub fn logged_in_client(server: &MockServer) -> Client {
    let client = client_for(server);
    log_in(&client);
    client
}

/// A salon record as the backend sends it.
#[allow(dead_code)]
pub fn salon_json() -> serde_json::Value {
    serde_json::json!({
        "_id": TEST_SALON_ID,
        "name": "Fade Street",
        "email": "owner@fade.st",
        "address": "1 Main St",
        "location": {"type": "Point", "coordinates": [77.59, 12.97]},
        "operatingHours": {"start": "09:00", "end": "18:00"},
        "averageRating": 4.5,
        "createdAt": "2024-11-02T10:15:00.000Z",
        "updatedAt": "2024-11-02T10:15:00.000Z",
        "__v": 0
    })
}

/// One decoded part of a multipart body.
#[allow(dead_code)]
#[derive(Debug, PartialEq, Eq)]
pub struct ReceivedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Decodes a received `multipart/form-data` body with `multer`.
#[allow(dead_code)]
pub async fn parse_multipart(body: Vec<u8>, content_type: &str) -> Vec<ReceivedPart> {
    let boundary = multer::parse_boundary(content_type).expect("multipart content type");
    let stream = futures_util::stream::once(async move {
        Ok::<_, std::convert::Infallible>(bytes::Bytes::from(body))
    });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("well-formed part") {
        let name = field.name().expect("part name").to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let data = field.bytes().await.expect("part body").to_vec();
        parts.push(ReceivedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    parts
}

/// Wraps a future with a timeout, panicking if the timeout is exceeded.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .unwrap_or_else(|_| panic!("Test timed out after {:?}", duration))
}
