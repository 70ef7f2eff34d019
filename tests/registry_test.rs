//! Registry behavior against a stubbed control-plane: TTL caching,
//! in-flight de-duplication, and fallback semantics.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scrapegate::api::ApiClient;
use scrapegate::catalog;
use scrapegate::registry::{ParserRegistry, RegistryConfig};

fn dynamic_registry(server: &MockServer) -> ParserRegistry {
    let api = ApiClient::new(server.uri(), Some("ayga_live_test".to_string()));
    ParserRegistry::new(api, RegistryConfig::default())
}

fn parser_row(id: &str, category: &str, enabled: Option<bool>) -> serde_json::Value {
    json!({
        "id": id,
        "name": id,
        "description": format!("{id} parser"),
        "category": category,
        "aparser_name": format!("Test::{id}"),
        "enabled": enabled,
    })
}

fn catalog_body(parsers: &[serde_json::Value]) -> serde_json::Value {
    json!({
        "parsers": parsers,
        "count": parsers.len(),
        "categories": ["SE"],
    })
}

#[tokio::test]
async fn test_cache_hit_within_ttl_fetches_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(&[
            parser_row("alpha", "SE", Some(true)),
            parser_row("beta", "SE", None),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let first = registry.get_parsers().await;
    let second = registry.get_parsers().await;

    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    // The expect(1) on the mock verifies no second fetch happened.
}

#[tokio::test]
async fn test_disabled_rows_are_filtered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(catalog_body(&[
            parser_row("alpha", "SE", Some(true)),
            parser_row("off", "SE", Some(false)),
        ])))
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let parsers = registry.get_parsers().await;
    assert_eq!(parsers.len(), 1);
    assert_eq!(parsers[0].id, "alpha");
}

#[tokio::test]
async fn test_concurrent_callers_share_one_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body(&[parser_row("alpha", "SE", None)]))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let (first, second) = tokio::join!(registry.get_parsers(), registry.get_parsers());

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_before_init_falls_back_to_static() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let parsers = registry.get_parsers().await;
    assert_eq!(parsers.len(), catalog::static_parsers().len());
}

#[tokio::test]
async fn test_fetch_failure_after_init_keeps_last_good_snapshot() {
    let server = MockServer::start().await;
    // One good response, then persistent failure.
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body(&[parser_row("alpha", "SE", None)])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let good = registry.get_parsers().await;
    assert_eq!(good.len(), 1);

    let after_failure = registry.refresh().await;
    // The dynamic snapshot survives the transient failure; no static
    // fallback once initialized.
    assert_eq!(after_failure, good);
    assert_ne!(after_failure.len(), catalog::static_parsers().len());
}

#[tokio::test]
async fn test_refresh_bypasses_ttl() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body(&[parser_row("alpha", "SE", None)])),
        )
        .expect(2)
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    registry.get_parsers().await;
    registry.refresh().await;
    // expect(2) verifies the refresh issued a second fetch inside the TTL.
}

#[tokio::test]
async fn test_stale_fetch_does_not_clear_refreshed_flight() {
    let server = MockServer::start().await;
    // First fetch: slow failure. Second fetch (from refresh): even slower
    // success.
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_string("boom")
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/parsers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(catalog_body(&[parser_row("alpha", "SE", None)]))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let stale = tokio::spawn({
        let registry = registry.clone();
        async move { registry.get_parsers().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let refreshed = tokio::spawn({
        let registry = registry.clone();
        async move { registry.refresh().await }
    });

    // Once the displaced first fetch has completed, a third caller must
    // attach to the refresh fetch instead of starting its own.
    tokio::time::sleep(Duration::from_millis(350)).await;
    let third = registry.get_parsers().await;

    let stale = stale.await.expect("stale fetch task");
    let refreshed = refreshed.await.expect("refresh task");
    assert_eq!(stale.len(), catalog::static_parsers().len());
    assert_eq!(refreshed.len(), 1);
    assert_eq!(third, refreshed);
    // expect(1) on each mock verifies exactly two fetches total.
}

#[tokio::test]
async fn test_options_override_is_case_insensitive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers/options"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "defaults": { "timeout": 120, "proxy": "http://proxy:8080", "user_agent": null },
            "overrides": {
                "ChatGPT": {
                    "parser_id": "ChatGPT",
                    "timeout": 30,
                    "enabled": false,
                    "proxy": null,
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);

    let override_options = registry.get_parser_options("chatgpt").await;
    assert_eq!(override_options.timeout, 30);
    assert!(!override_options.enabled);

    // No override: defaults merged with the requested id and enabled=true.
    let merged = registry.get_parser_options("perplexity").await;
    assert_eq!(merged.parser_id, "perplexity");
    assert_eq!(merged.timeout, 120);
    assert!(merged.enabled);
    assert_eq!(merged.proxy.as_deref(), Some("http://proxy:8080"));
}

#[tokio::test]
async fn test_options_fetch_failure_is_non_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/parsers/options"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let registry = dynamic_registry(&server);
    let options = registry.get_parser_options("perplexity").await;
    assert_eq!(options.parser_id, "perplexity");
    assert_eq!(options.timeout, 60);
    assert!(options.enabled);
}
