//! Tests for the authenticated request path against a mock backend.

mod common;

use bytes::Bytes;
use common::*;
use quickcuts_admin::http::request::send;
use quickcuts_admin::{
    ApiResult, FilePart, MemorySettings, MultipartForm, RequestIntent, SessionStore,
    SettingsStore,
};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

async fn only_request(server: &MockServer) -> Request {
    let mut requests = server
        .received_requests()
        .await
        .expect("request recording is enabled");
    assert_eq!(requests.len(), 1, "expected exactly one request");
    requests.remove(0)
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|v| v.to_str().ok())
}

#[tokio::test]
async fn test_logged_in_request_carries_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/salons/profile"))
        .and(header("Authorization", "Bearer test-token"))
        .and(header("Content-Type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let url = format!("{}/api/salons/profile", server.uri());
    let result = client.send(RequestIntent::get(url)).await;

    assert_eq!(result, ApiResult::Success(Bytes::from_static(br#"{"ok":true}"#)));
}

#[tokio::test]
async fn test_logged_out_request_has_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/salon/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let url = format!("{}/api/auth/salon/login", server.uri());
    let result = client
        .send(RequestIntent::post(url).with_json(json!({"email": "a@b.c"})))
        .await;
    assert!(result.is_success());

    let request = only_request(&server).await;
    assert!(request.headers.get("authorization").is_none());
    assert_eq!(header_value(&request, "content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_caller_header_overrides_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let intent = RequestIntent::get(format!("{}/api/salons/profile", server.uri()))
        .with_header("authorization", "Bearer caller-token");
    assert!(client.send(intent).await.is_success());

    let request = only_request(&server).await;
    let values: Vec<_> = request.headers.get_all("authorization").iter().collect();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0], "Bearer caller-token");
}

#[tokio::test]
async fn test_401_clears_session_and_fires_hook_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/salons/profile"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&server)
        .await;

    let (client, calls) = client_with_counter(&server);
    log_in(&client);

    let result = client
        .send(RequestIntent::get(format!("{}/api/salons/profile", server.uri())))
        .await;

    assert_eq!(result, ApiResult::AuthExpired);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!client.session().is_logged_in());
    assert!(client.session().token().is_none());
    assert!(client.session().profile().is_none());
}

#[tokio::test]
async fn test_401_persists_logged_out_flag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let settings = Arc::new(MemorySettings::new());
    let client = quickcuts_admin::Client::builder(format!("{}/api", server.uri()))
        .settings(settings.clone())
        .build()
        .unwrap();
    client.session().set_session("tok");

    let result = client
        .send(RequestIntent::get(format!("{}/api/salons/profile", server.uri())))
        .await;
    assert_eq!(result, ApiResult::AuthExpired);

    assert_eq!(settings.get("isLoggedIn"), Some(json!(false)));
    assert_eq!(settings.get("authToken"), None);
    assert!(!SessionStore::load(settings).is_logged_in());
}

#[tokio::test]
async fn test_each_401_response_fires_the_hook() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(3)
        .mount(&server)
        .await;

    let (client, calls) = client_with_counter(&server);
    log_in(&client);
    let url = format!("{}/api/salons/profile", server.uri());

    let results = futures_util::future::join_all(
        (0..3).map(|_| client.send(RequestIntent::get(url.clone()))),
    )
    .await;

    assert!(results.iter().all(|r| *r == ApiResult::AuthExpired));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn test_empty_2xx_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let result = client
        .send(RequestIntent::delete(format!("{}/api/salons/services/1", server.uri())))
        .await;

    assert_eq!(result, ApiResult::TransportError("no data".to_string()));
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn test_server_error_keeps_body_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(r#"{"message":"boom"}"#))
        .mount(&server)
        .await;

    let (client, calls) = client_with_counter(&server);
    log_in(&client);
    let result = client
        .send(RequestIntent::post(format!("{}/api/salons/services", server.uri())))
        .await;

    assert_eq!(
        result,
        ApiResult::ServerError(500, Bytes::from_static(br#"{"message":"boom"}"#))
    );
    assert_eq!(result.display_message().as_deref(), Some("boom"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn test_server_error_without_message_uses_generic_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403).set_body_string("<html>Forbidden</html>"))
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let result = client
        .send(RequestIntent::get(format!("{}/api/salons/profile", server.uri())))
        .await;

    assert_eq!(
        result.display_message().as_deref(),
        Some("Server error with status code 403.")
    );
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn test_get_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(body_json(json!({"salonId": "salon-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = logged_in_client(&server);
    let intent = RequestIntent::get(format!("{}/api/anything", server.uri()))
        .with_json(json!({"salonId": "salon-1"}));

    assert!(client.send(intent).await.is_success());
}

#[tokio::test]
async fn test_multipart_body_is_received_intact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_string("created"))
        .mount(&server)
        .await;

    let image = vec![0xFF, 0xD8, 0x00, 0x0D, 0x0A, 0xFF, 0xD9];
    let form = MultipartForm::new(FilePart {
        field_name: "serviceImage".to_string(),
        file_name: "serviceImage.jpg".to_string(),
        mime_type: "image/jpeg".to_string(),
        bytes: image.clone(),
    })
    .with_text("name", "Haircut")
    .with_text("price", "25");

    let client = logged_in_client(&server);
    let intent = RequestIntent::post(format!("{}/api/salons/services", server.uri()))
        .with_json(json!({"ignored": true}))
        .with_multipart(form);
    assert!(client.send(intent).await.is_success());

    let request = only_request(&server).await;
    assert_eq!(header_value(&request, "authorization"), Some("Bearer test-token"));
    let content_type = header_value(&request, "content-type").expect("content type");
    let parts = parse_multipart(request.body.clone(), content_type).await;

    assert_eq!(parts.len(), 3);
    assert_eq!((parts[0].name.as_str(), parts[0].data.as_slice()), ("name", b"Haircut".as_slice()));
    assert_eq!((parts[1].name.as_str(), parts[1].data.as_slice()), ("price", b"25".as_slice()));
    assert_eq!(parts[2].name, "serviceImage");
    assert_eq!(parts[2].file_name.as_deref(), Some("serviceImage.jpg"));
    assert_eq!(parts[2].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(parts[2].data, image);
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let server = MockServer::start().await;
    let url = format!("{}/api/salons/profile", server.uri());
    drop(server);

    let client = quickcuts_admin::Client::new("http://unused/api").unwrap();
    client.session().set_session("tok");
    let result = client.send(RequestIntent::get(url)).await;

    assert!(matches!(result, ApiResult::TransportError(_)));
    assert!(client.session().is_logged_in());
}

#[tokio::test]
async fn test_invalid_header_fails_before_sending() {
    let server = MockServer::start().await;
    let client = logged_in_client(&server);
    let intent = RequestIntent::get(format!("{}/api/salons/profile", server.uri()))
        .with_header("X-Note", "line\nbreak");

    let result = client.send(intent).await;

    assert!(matches!(result, ApiResult::TransportError(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dropped_future_still_clears_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .mount(&server)
        .await;

    let (client, calls) = client_with_counter(&server);
    log_in(&client);
    let url = format!("{}/api/salons/profile", server.uri());

    let outcome =
        tokio::time::timeout(Duration::from_millis(50), client.send(RequestIntent::get(url))).await;
    assert!(outcome.is_err(), "caller should have given up first");
    assert!(client.session().is_logged_in());

    with_timeout(TEST_TIMEOUT, async {
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!client.session().is_logged_in());
}

#[tokio::test]
async fn test_send_leaves_session_to_the_callback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let session = SessionStore::in_memory();
    session.set_session("tok");
    let calls = AtomicUsize::new(0);

    let result = send(
        &reqwest::Client::new(),
        &session,
        RequestIntent::get(format!("{}/api/salons/profile", server.uri())),
        || {
            calls.fetch_add(1, Ordering::SeqCst);
        },
    )
    .await;

    assert_eq!(result, ApiResult::AuthExpired);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(session.is_logged_in());
}
