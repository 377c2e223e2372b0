//! Integration tests for the language center resolver
//!
//! These tests drive the public API against a mocked language center and
//! check the full lookup workflow: bootstrap, caching, fallback and
//! auto-creation of missing strings.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::{
    matchers::{any, body_string_contains, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use language_center::{
    config::Config,
    store::{locale_timestamp_key, LANGUAGES_KEY, LANGUAGES_TIMESTAMP_KEY, STRINGS_KEY},
    warm_cache, CacheStore, Error, FileStore, LookupRequest, MemoryLoader, MemoryStore,
    StaticLoader, Translation, TranslationResolver,
};

// ==================== Test Helpers ====================

/// Create a test config pointing at the mock server
fn create_test_config(server: &MockServer) -> Config {
    Config::new(&format!("{}/api", server.uri())).with_credentials("bot", "secret")
}

fn create_resolver(
    config: &Config,
    store: Arc<dyn CacheStore>,
    loader: MemoryLoader,
) -> TranslationResolver {
    let loader: Arc<dyn StaticLoader> = Arc::new(loader);
    TranslationResolver::new(config, store, loader).expect("Failed to create resolver")
}

async fn mount_languages(server: &MockServer, languages: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .and(query_param("timestamp", "on"))
        .respond_with(ResponseTemplate::new(200).set_body_json(languages))
        .mount(server)
        .await;
}

async fn mount_strings(server: &MockServer, locale: &str, strings: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/strings"))
        .and(query_param("language", locale))
        .respond_with(ResponseTemplate::new(200).set_body_json(strings))
        .mount(server)
        .await;
}

/// A store holding a fresh English snapshot
fn seeded_store(strings: serde_json::Value, language_timestamp: i64) -> Arc<MemoryStore> {
    let now = Utc::now().timestamp();
    let store = MemoryStore::new();
    store
        .put(
            LANGUAGES_KEY,
            json!([{"codename": "en", "is_fallback": true, "timestamp": language_timestamp}]),
        )
        .unwrap();
    store.put(LANGUAGES_TIMESTAMP_KEY, json!(now)).unwrap();
    store.put(STRINGS_KEY, strings).unwrap();
    store.put(&locale_timestamp_key("en"), json!(now)).unwrap();
    Arc::new(store)
}

// ==================== Auto-creation Tests ====================

#[tokio::test]
async fn test_missing_key_is_created_once() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(&server, "en", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/string"))
        .and(body_string_contains("platform=web"))
        .and(body_string_contains("category=Greeting"))
        .and(body_string_contains("key=Hello"))
        .and(body_string_contains("value=greeting.hello"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let first = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(first, Translation::Text("greeting.hello".to_string()));

    // Placeholder is cached now, so no second create
    let second = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(second, Translation::Text("greeting.hello".to_string()));

    assert_eq!(resolver.metrics().strings_created(), 1);
}

#[tokio::test]
async fn test_detailed_request_sends_default_string_and_comment() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(&server, "en", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/string"))
        .and(body_string_contains("platform=ios"))
        .and(body_string_contains("value=Hello+there"))
        .and(body_string_contains("comment=Landing"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let request = LookupRequest::detailed("greeting.hello")
        .with_default_string("Hello there")
        .with_platform("ios")
        .with_comment("Landing");
    let line = resolver.resolve(request, &[], None, None, true).await.unwrap();

    assert_eq!(line.as_text(), Some("Hello there"));
}

#[tokio::test]
async fn test_failed_create_still_returns_placeholder() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(&server, "en", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/string"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(line.as_text(), Some("greeting.hello"));
    assert_eq!(resolver.metrics().remote_failures(), 1);
}

// ==================== Cache Tests ====================

#[tokio::test]
async fn test_fresh_snapshot_makes_no_requests() {
    let server = MockServer::start().await;
    let store = seeded_store(json!({"en": {"web": {"greeting.hello": "Hi :name"}}}), 100);

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, store, MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[("name", "Sam")]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hi Sam"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests.is_empty(), "Expected no requests, got {}", requests.len());
}

#[tokio::test]
async fn test_failed_refresh_keeps_cached_value() {
    let server = MockServer::start().await;
    // Language reports edits newer than the last sync
    let future = Utc::now().timestamp() + 3600;
    let store = seeded_store(json!({"en": {"web": {"greeting.hello": "Hi :name"}}}), future);

    Mock::given(method("GET"))
        .and(path("/api/strings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, store, MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[("name", "Sam")]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hi Sam"));
}

#[tokio::test]
async fn test_update_after_disabled_never_rechecks() {
    let server = MockServer::start().await;
    let future = Utc::now().timestamp() + 3600;
    let store = seeded_store(json!({"en": {"web": {"greeting.hello": "Hello"}}}), future);

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server).with_update_after(None);
    let resolver = create_resolver(&config, store, MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hello"));
}

#[tokio::test]
async fn test_update_after_disabled_still_loads_strings_once() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/strings"))
        .and(query_param("language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"key": "greeting.hello", "value": "Hello", "language": "en"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/string"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server).with_update_after(None);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    assert_eq!(resolver.get("greeting.hello", &[]).await.unwrap().as_text(), Some("Hello"));
    assert_eq!(resolver.get("greeting.hello", &[]).await.unwrap().as_text(), Some("Hello"));
    assert_eq!(resolver.metrics().strings_created(), 0);
}

#[tokio::test]
async fn test_failing_other_locale_does_not_fail_lookup() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([
            {"codename": "en", "is_fallback": true, "timestamp": 100},
            {"codename": "da", "is_fallback": false, "timestamp": 100}
        ]),
    )
    .await;
    mount_strings(
        &server,
        "en",
        json!([{"key": "greeting.hello", "value": "Hello", "language": "en"}]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/strings"))
        .and(query_param("language", "da"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let line = resolver
        .resolve("greeting.hello", &[], Some("en"), None, true)
        .await
        .unwrap();
    assert_eq!(line.as_text(), Some("Hello"));
}

#[tokio::test]
async fn test_file_store_persists_across_resolvers() {
    let server = MockServer::start().await;
    let temp_dir = TempDir::new().unwrap();
    let cache_path = temp_dir.path().join("languagecenter.json");

    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(
        &server,
        "en",
        json!([{"key": "greeting.hello", "value": "Hello", "language": "en"}]),
    )
    .await;

    let config = create_test_config(&server);

    let first = create_resolver(&config, Arc::new(FileStore::new(&cache_path)), MemoryLoader::new());
    assert_eq!(first.get("greeting.hello", &[]).await.unwrap().as_text(), Some("Hello"));
    let requests_after_first = server.received_requests().await.unwrap().len();
    assert_eq!(requests_after_first, 2);

    // Second resolver reads the file, no new requests
    let second = create_resolver(&config, Arc::new(FileStore::new(&cache_path)), MemoryLoader::new());
    assert_eq!(second.get("greeting.hello", &[]).await.unwrap().as_text(), Some("Hello"));
    assert_eq!(server.received_requests().await.unwrap().len(), requests_after_first);
}

// ==================== Fallback Tests ====================

#[tokio::test]
async fn test_fallback_chain_uses_fallback_locale() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([
            {"codename": "da", "is_fallback": false, "timestamp": 100},
            {"codename": "en", "is_fallback": false, "timestamp": 100}
        ]),
    )
    .await;
    mount_strings(&server, "da", json!([])).await;
    mount_strings(
        &server,
        "en",
        json!([{"key": "greeting.hello", "value": "Hello", "language": "en"}]),
    )
    .await;

    let config = create_test_config(&server).with_locales("da", "en");
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hello"));
    assert_eq!(resolver.locale(), "da");
}

#[tokio::test]
async fn test_flagged_fallback_language_becomes_locale() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([
            {"codename": "da", "is_fallback": 0, "timestamp": 100},
            {"codename": "sv", "is_fallback": 1, "timestamp": 100}
        ]),
    )
    .await;
    mount_strings(
        &server,
        "sv",
        json!([{"key": "greeting.hello", "value": "Hej", "language": "sv"}]),
    )
    .await;
    mount_strings(&server, "da", json!([])).await;

    let config = create_test_config(&server).with_locales("da", "en");
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let line = resolver.get("greeting.hello", &[]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hej"));

    let ctx = resolver.locale_context();
    assert_eq!(ctx.locale(), "sv");
    assert_eq!(ctx.fallback(), "sv");
}

#[tokio::test]
async fn test_static_loader_answers_when_cache_misses() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(&server, "en", json!([])).await;

    Mock::given(method("POST"))
        .and(path("/api/string"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let loader = MemoryLoader::new().with_lines(
        "*",
        "greeting",
        "en",
        json!({"hello": "Hi :Name", "days": ["Mon", "Tue"]}),
    );
    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), loader);

    let line = resolver.get("greeting.hello", &[("name", "sam")]).await.unwrap();
    assert_eq!(line.as_text(), Some("Hi Sam"));

    let days = resolver.get("greeting.days", &[]).await.unwrap();
    assert_eq!(days, Translation::Array(json!(["Mon", "Tue"])));
    assert_eq!(resolver.metrics().static_hits(), 2);
}

// ==================== Error Tests ====================

#[tokio::test]
async fn test_bootstrap_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .mount(&server)
        .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let result = resolver.get("greeting.hello", &[]).await;
    match result {
        Err(Error::RemoteStatus { status, .. }) => assert_eq!(status, 500),
        other => panic!("Expected RemoteStatus error, got {:?}", other),
    }
}

// ==================== Warm Tests ====================

#[tokio::test]
async fn test_warm_then_resolve_without_requests() {
    let server = MockServer::start().await;
    mount_languages(
        &server,
        json!([{"codename": "en", "is_fallback": true, "timestamp": 100}]),
    )
    .await;
    mount_strings(
        &server,
        "en",
        json!([{"key": "greeting.hello", "value": "Hello", "language": "en"}]),
    )
    .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, Arc::new(MemoryStore::new()), MemoryLoader::new());

    let report = warm_cache(&resolver, &["web".to_string()]).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.total_strings(), 1);

    let warmed = server.received_requests().await.unwrap().len();
    assert_eq!(resolver.get("greeting.hello", &[]).await.unwrap().as_text(), Some("Hello"));
    assert_eq!(server.received_requests().await.unwrap().len(), warmed);
}

#[tokio::test]
async fn test_warm_falls_back_to_stored_languages() {
    let server = MockServer::start().await;
    let store = seeded_store(json!({}), 100);

    Mock::given(method("GET"))
        .and(path("/api/languages"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_strings(
        &server,
        "en",
        json!([{"key": "greeting.hello", "value": "Hello", "language": "en"}]),
    )
    .await;

    let config = create_test_config(&server);
    let resolver = create_resolver(&config, store, MemoryLoader::new());

    let report = warm_cache(&resolver, &["web".to_string()]).await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.refreshed, vec![("en".to_string(), "web".to_string(), 1)]);
    assert_eq!(resolver.languages(), vec!["en"]);
}
