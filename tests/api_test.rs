//! Control-plane client behavior against a stubbed backend.

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrapegate::api::{ApiClient, ApiError};

#[tokio::test]
async fn test_check_limits_decodes_windows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/limits"))
        .and(header("X-API-Key", "ayga_live_test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "key_id": "key-1",
            "name": "ci",
            "status": "active",
            "minute": { "used": 3, "limit": 60, "remaining": 57, "resets_in": 42 },
            "day": { "used": 100, "limit": 5000, "remaining": 4900, "date": "2026-08-23" },
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Some("ayga_live_test".to_string()));
    let limits = client.check_limits().await.expect("limits decode");

    assert_eq!(limits.key_id, "key-1");
    assert_eq!(limits.minute.remaining, 57);
    assert_eq!(limits.day.date, "2026-08-23");
}

#[tokio::test]
async fn test_check_limits_surfaces_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/limits"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), Some("ayga_live_bad".to_string()));
    let err = client.check_limits().await.expect_err("401 is an error");

    match err {
        ApiError::UnexpectedStatus { status, body, .. } => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(body, "invalid key");
        }
        other => panic!("expected UnexpectedStatus, got {other:?}"),
    }
}

#[tokio::test]
async fn test_check_limits_without_key_is_local_error() {
    // Unroutable address: the error must be raised before any connection.
    let client = ApiClient::new("http://127.0.0.1:1", None);
    let err = client.check_limits().await.expect_err("no key");
    assert!(matches!(err, ApiError::MissingApiKey));
}

#[tokio::test]
async fn test_catalog_read_works_without_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "parsers": [],
            "count": 0,
            "categories": [],
        })))
        .mount(&server)
        .await;

    let client = ApiClient::new(server.uri(), None);
    let response = client.fetch_parsers().await.expect("anonymous catalog read");
    assert!(response.parsers.is_empty());
}
