//! Integration tests for SecretsService.
//!
//! Drives conditional revalidation, cache overwrites, raw formats and
//! diff-based pushes against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use doppler_secrets::{
    ApiClient, CacheKey, CacheStore, Change, ClientConfig, PushOutcome, Secrets, SecretsCache,
    SecretsError, SecretsFormat, SecretsRequest, SecretsResponse, SecretsService, StoreConfig,
    UpdateSecretsRequest,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-token";
const DOWNLOAD: &str = "/v3/configs/config/secrets/download";
const PUSH: &str = "/v3/configs/config/secrets";

fn create_service(mock_server: &MockServer, cache: Arc<SecretsCache>) -> SecretsService {
    let config = ClientConfig::default().with_base_url(mock_server.uri());
    let client = ApiClient::new(TOKEN, config).expect("failed to create client");
    SecretsService::new(client, cache, StoreConfig::new("backend", "prd"))
}

fn enabled_cache(ttl_secs: u64) -> Arc<SecretsCache> {
    Arc::new(CacheStore::enabled_with_ttl(Duration::from_secs(ttl_secs)))
}

fn secrets(pairs: &[(&str, &str)]) -> Secrets {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn cached_response(pairs: &[(&str, &str)], etag: &str) -> SecretsResponse {
    let secrets = secrets(pairs);
    SecretsResponse {
        body: serde_json::to_vec(&secrets).unwrap(),
        secrets: Some(secrets),
        etag: Some(etag.to_string()),
        not_modified: false,
    }
}

/// Seed an entry that was last checked an hour ago.
fn seed_expired(cache: &SecretsCache, request: &SecretsRequest, data: SecretsResponse) {
    let key = CacheKey::for_request(TOKEN, request);
    cache.write(
        key,
        data.etag.clone(),
        Utc::now() - TimeDelta::seconds(3600),
        data,
    );
}

#[tokio::test]
async fn test_304_returns_cached_payload_without_decoding() {
    let mock_server = MockServer::start().await;
    let cache = enabled_cache(1);
    let request = SecretsRequest::new("backend", "prd");
    let cached = cached_response(&[("API_KEY", "cached")], "\"abc\"");
    seed_expired(&cache, &request, cached.clone());
    let seeded_at = cache
        .read(&CacheKey::for_request(TOKEN, &request))
        .unwrap()
        .last_checked_at;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(header("if-none-match", "\"abc\""))
        .respond_with(
            ResponseTemplate::new(304)
                .set_body_string("this is not json")
                .insert_header("etag", "\"abc\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, Arc::clone(&cache));
    let response = service.get_secrets(&request).await.expect("get failed");

    assert_eq!(response, cached);
    assert!(!response.not_modified);

    // No cache write on 304: the check time stays where it was.
    let entry = cache.read(&CacheKey::for_request(TOKEN, &request)).unwrap();
    assert_eq!(entry.last_checked_at, seeded_at);
    assert!(entry.is_expired());
}

#[tokio::test]
async fn test_200_overwrites_cache_entry() {
    let mock_server = MockServer::start().await;
    let cache = enabled_cache(60);
    let request = SecretsRequest::new("backend", "prd");
    seed_expired(&cache, &request, cached_response(&[("API_KEY", "old")], "\"v1\""));

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"API_KEY":"new","DB_URL":"postgres://db"}"#)
                .insert_header("etag", "\"v2\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, Arc::clone(&cache));
    let response = service.get_secrets(&request).await.expect("get failed");
    assert_eq!(response.get("API_KEY"), Some("new"));
    assert_eq!(response.etag.as_deref(), Some("\"v2\""));

    let entry = cache.read(&CacheKey::for_request(TOKEN, &request)).unwrap();
    assert_eq!(entry.etag.as_deref(), Some("\"v2\""));
    assert_eq!(entry.data, response);
    assert_eq!(entry.ttl, Duration::from_secs(60));
    assert!(!entry.is_expired());
}

#[tokio::test]
async fn test_fresh_entry_is_served_without_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"API_KEY":"k"}"#)
                .insert_header("etag", "\"v1\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(300));
    let request = SecretsRequest::new("backend", "prd");

    let first = service.get_secrets(&request).await.expect("first get failed");
    let second = service.get_secrets(&request).await.expect("second get failed");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"API_KEY":"k"}"#)
                .insert_header("etag", "\"v1\""),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let cache: Arc<SecretsCache> = Arc::new(CacheStore::new());
    let service = create_service(&mock_server, Arc::clone(&cache));
    let request = SecretsRequest::new("backend", "prd");

    service.get_secrets(&request).await.expect("first get failed");
    service.get_secrets(&request).await.expect("second get failed");
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_raw_format_is_cached_as_bytes() {
    let mock_server = MockServer::start().await;
    let body = "API_KEY=\"k\"\nDB_URL=\"{not json\"\n";

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(query_param("format", "env"))
        .and(header("accept", "text/plain"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("etag", "\"env1\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = enabled_cache(60);
    let service = create_service(&mock_server, Arc::clone(&cache));
    let request = SecretsRequest::new("backend", "prd").with_format(SecretsFormat::Env);

    let response = service.get_secrets(&request).await.expect("get failed");
    assert!(response.secrets.is_none());
    assert_eq!(response.body, body.as_bytes());

    let entry = cache.read(&CacheKey::for_request(TOKEN, &request)).unwrap();
    assert_eq!(entry.data.body, body.as_bytes());
    assert!(entry.data.secrets.is_none());

    // The JSON-shaped request for the same project/config is a different entry.
    let json_key = CacheKey::for_request(TOKEN, &SecretsRequest::new("backend", "prd"));
    assert!(cache.read(&json_key).is_none());
}

#[tokio::test]
async fn test_caller_etag_without_cache_entry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(header("if-none-match", "\"caller\""))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let request = SecretsRequest::new("backend", "prd").with_etag("\"caller\"");

    let response = service.get_secrets(&request).await.expect("get failed");
    assert!(response.not_modified);
    assert!(response.secrets.is_none());
    assert_eq!(response.etag.as_deref(), Some("\"caller\""));
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"API_KEY\":"))
        .mount(&mock_server)
        .await;

    let cache = enabled_cache(60);
    let service = create_service(&mock_server, Arc::clone(&cache));
    let result = service.get_secrets(&SecretsRequest::new("backend", "prd")).await;

    assert!(matches!(result, Err(SecretsError::Decode { .. })));
    assert!(cache.is_empty());
}

#[tokio::test]
async fn test_get_secret_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(query_param("project", "backend"))
        .and(query_param("config", "prd"))
        .and(query_param("secrets", "API_KEY"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"API_KEY":"k"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let secret = service.get_secret("API_KEY").await.expect("get failed");
    assert_eq!(secret.name, "API_KEY");
    assert_eq!(secret.value, "k");
}

#[tokio::test]
async fn test_get_secret_absent_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"OTHER":"x"}"#))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let result = service.get_secret_in("MISSING", "backend", "dev").await;

    match result {
        Err(SecretsError::NotFound { name }) => assert_eq!(name, "MISSING"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_get_secret_transport_failure_is_not_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let result = service.get_secret("API_KEY").await;
    assert!(matches!(
        result,
        Err(SecretsError::HttpStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_push_sends_only_changed_values() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"A":"1","B":"9"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .and(body_json(serde_json::json!({
            "secrets": {"B": "2"},
            "project": "backend",
            "config": "prd"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let request = UpdateSecretsRequest::new("backend", "prd")
        .with_secret("A", "1")
        .with_secret("B", "2");

    let outcome = service.update_secrets(request).await.expect("push failed");
    assert_eq!(
        outcome,
        PushOutcome::Pushed {
            keys: vec!["B".to_string()]
        }
    );
}

#[tokio::test]
async fn test_push_without_differences_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"A":"1","B":"2"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let request = UpdateSecretsRequest::new("backend", "prd")
        .with_secret("A", "1")
        .with_secret("B", "2");

    let outcome = service.update_secrets(request).await.expect("push failed");
    assert_eq!(outcome, PushOutcome::Unchanged);
}

#[tokio::test]
async fn test_push_creates_secret_missing_remotely_even_if_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"A":"1"}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .and(body_json(serde_json::json!({
            "secrets": {"EMPTY": ""},
            "project": "backend",
            "config": "prd"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let outcome = service
        .update_secrets(UpdateSecretsRequest::default().with_secret("EMPTY", ""))
        .await
        .expect("push failed");
    assert!(matches!(outcome, PushOutcome::Pushed { .. }));
}

#[tokio::test]
async fn test_push_diff_revalidates_fresh_cache_entry() {
    let mock_server = MockServer::start().await;
    let cache = enabled_cache(300);

    // Fresh (unexpired) entry that no longer matches the remote.
    let diff_request = SecretsRequest::new("backend", "prd");
    cache.write(
        CacheKey::for_request(TOKEN, &diff_request),
        Some("\"v1\"".to_string()),
        Utc::now(),
        cached_response(&[("B", "2")], "\"v1\""),
    );

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .and(header("if-none-match", "\"v1\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"B":"9"}"#)
                .insert_header("etag", "\"v2\""),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .and(body_json(serde_json::json!({
            "secrets": {"B": "2"},
            "project": "backend",
            "config": "prd"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, Arc::clone(&cache));
    let outcome = service
        .update_secrets(UpdateSecretsRequest::new("backend", "prd").with_secret("B", "2"))
        .await
        .expect("push failed");

    assert!(matches!(outcome, PushOutcome::Pushed { .. }));
    let entry = cache.read(&CacheKey::for_request(TOKEN, &diff_request)).unwrap();
    assert_eq!(entry.etag.as_deref(), Some("\"v2\""));
}

#[tokio::test]
async fn test_push_error_is_surfaced() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"A":"1"}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "messages": ["This token does not have write access"],
            "success": false
        })))
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let result = service
        .update_secrets(UpdateSecretsRequest::default().with_secret("A", "2"))
        .await;

    match result {
        Err(SecretsError::HttpStatus { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "This token does not have write access");
        }
        other => panic!("expected HttpStatus error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_sends_change_requests_for_existing_names() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"OLD":"x","KEEP":"y"}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .and(body_json(serde_json::json!({
            "change_requests": [
                {"name": "OLD", "originalName": "OLD", "value": null, "shouldDelete": true}
            ],
            "project": "backend",
            "config": "prd"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let outcome = service
        .delete_secrets(["OLD", "NEVER_EXISTED"])
        .await
        .expect("delete failed");

    assert_eq!(
        outcome,
        PushOutcome::Pushed {
            keys: vec!["OLD".to_string()]
        }
    );
}

#[tokio::test]
async fn test_noop_change_request_sends_nothing() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"A":"1"}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path(PUSH))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = create_service(&mock_server, enabled_cache(60));
    let request = UpdateSecretsRequest::default()
        .with_change(Change::set("A", "1"))
        .with_change(Change::delete("GONE"));

    let outcome = service.update_secrets(request).await.expect("push failed");
    assert_eq!(outcome, PushOutcome::Unchanged);
}

#[tokio::test]
async fn test_concurrent_cold_callers_both_fetch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(DOWNLOAD))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"A":"1"}"#)
                .insert_header("etag", "\"v1\"")
                .set_delay(Duration::from_millis(100)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let cache = enabled_cache(60);
    let service = create_service(&mock_server, Arc::clone(&cache));
    let request = SecretsRequest::new("backend", "prd");

    let (a, b) = tokio::join!(service.get_secrets(&request), service.get_secrets(&request));
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(cache.len(), 1);
}
