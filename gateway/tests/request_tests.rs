//! Authenticated requests: retry-once on 401 and request logging.

mod common;

use chrono::Utc;
use common::*;
use research_monitor_gateway::{
    GatewayClient,
    RequestContext,
    RequestError,
    RequestLog,
    RequestLogEntry,
};
use std::{
    path::Path,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
    time::Duration,
};

/// Resource that answers 401 for the first `unauthorized` calls and 200 afterwards.
async fn mount_flaky_resource(server: &MockServer, unauthorized: usize) -> Arc<AtomicUsize> {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    Mock::given(method("GET"))
        .and(path("/graph/v1/organizations"))
        .respond_with(move |_req: &wiremock::Request| {
            if counter.fetch_add(1, Ordering::SeqCst) < unauthorized {
                ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "expired"}))
            } else {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "total": 1,
                    "results": [{"id": "openorgs____::0001"}],
                }))
            }
        })
        .mount(server)
        .await;
    calls
}

#[tokio::test]
async fn successful_request_uses_bearer_token() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 3600).await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/organizations"))
        .and(header("authorization", "Bearer token-1"))
        .and(query_param("size", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let url = client.endpoint("organizations").unwrap();
    let payload = client
        .request(&url, &[("size", "1".to_string())], RequestContext::new("test"))
        .await
        .unwrap();
    assert!(payload.is_paginated());
    assert!(payload.results().is_empty());
}

#[tokio::test]
async fn unauthorized_response_refreshes_and_retries_once() {
    let server = MockServer::start().await;
    let exchanges = mount_token_endpoint(&server, 3600).await;
    let calls = mount_flaky_resource(&server, 1).await;

    let client = client(&server);
    let url = client.endpoint("organizations").unwrap();
    let payload = client.request(&url, &[], RequestContext::new("test")).await.unwrap();

    assert_eq!(payload.total(), 1);
    assert_eq!(count(&calls), 2, "one original call and one retry");
    assert_eq!(count(&exchanges), 2, "initial token and one refresh");
}

#[tokio::test]
async fn second_unauthorized_response_is_terminal() {
    let server = MockServer::start().await;
    let exchanges = mount_token_endpoint(&server, 3600).await;
    let calls = mount_flaky_resource(&server, usize::MAX).await;

    let client = client(&server);
    let url = client.endpoint("organizations").unwrap();
    let err = client.request(&url, &[], RequestContext::new("test")).await.unwrap_err();

    assert!(err.is_unauthorized_after_retry(), "unexpected error: {err:?}");
    assert_eq!(count(&calls), 2, "no retry beyond the first");
    assert_eq!(count(&exchanges), 2);
}

#[tokio::test]
async fn other_failures_are_not_retried() {
    let server = MockServer::start().await;
    let exchanges = mount_token_endpoint(&server, 3600).await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/results"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let url = client.endpoint("results").unwrap();
    let err = client.request(&url, &[], RequestContext::new("test")).await.unwrap_err();

    assert!(
        matches!(err, RequestError::Status { status: 503, retried: false, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(count(&exchanges), 1);
}

#[tokio::test]
async fn missing_token_fails_without_calling_the_resource() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server);
    let url = client.endpoint("organizations").unwrap();
    let err = client.request(&url, &[], RequestContext::new("test")).await.unwrap_err();
    assert!(matches!(err, RequestError::Auth(_)), "unexpected error: {err:?}");
}

fn read_entries(client: &GatewayClient) -> Vec<RequestLogEntry> {
    let path = client.request_log().sink().unwrap().path_for(Utc::now().date_naive());
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn impatient_client(server: &MockServer, logs_dir: &Path) -> GatewayClient {
    let mut config = api_config(server);
    config.timeout_secs = 1;
    GatewayClient::new(&config, RequestLog::in_dir(logs_dir)).unwrap()
}

#[tokio::test]
async fn timed_out_request_fails_without_retry() {
    let server = MockServer::start().await;
    let exchanges = mount_token_endpoint(&server, 3600).await;
    Mock::given(method("GET"))
        .and(path("/graph/v1/results"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"results": []}))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;
    let logs = temp_dir::TempDir::new().unwrap();

    let client = impatient_client(&server, logs.path());
    let url = client.endpoint("results").unwrap();
    let err = client.request(&url, &[], RequestContext::new("get_publications")).await.unwrap_err();

    assert!(matches!(err, RequestError::Transport { .. }), "unexpected error: {err:?}");
    assert_eq!(count(&exchanges), 1);

    let requests: Vec<RequestLogEntry> = read_entries(&client)
        .into_iter()
        .filter(|entry| entry.method == "GET")
        .collect();
    assert_eq!(requests.len(), 1);
    let entry = &requests[0];
    assert!(!entry.success);
    assert!(!entry.context.retry_attempted);
    assert_eq!(entry.status_code, None);
    assert_eq!(entry.error_type.as_deref(), Some("Timeout"));
    assert!(entry.error.is_some());
}

#[tokio::test]
async fn every_attempt_is_logged_with_its_retry_flag() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 3600).await;
    mount_flaky_resource(&server, 1).await;
    let logs = temp_dir::TempDir::new().unwrap();

    let client = client_logging_to(&server, logs.path());
    let url = client.endpoint("organizations").unwrap();
    client
        .request(
            &url,
            &[("pid", "https://ror.org/04dkp9463".to_string())],
            RequestContext::new("get_organization_id"),
        )
        .await
        .unwrap();

    let entries = read_entries(&client);

    let operations: Vec<(&str, &str, bool, Option<u16>)> = entries
        .iter()
        .map(|entry| {
            (
                entry.method.as_str(),
                entry.context.operation.as_str(),
                entry.context.retry_attempted,
                entry.status_code,
            )
        })
        .collect();
    assert_eq!(
        operations,
        vec![
            ("POST", "get_access_token", false, Some(200)),
            ("GET", "get_organization_id", false, Some(401)),
            ("POST", "get_access_token", false, Some(200)),
            ("GET", "get_organization_id", true, Some(200)),
        ]
    );

    let retried = &entries[3];
    assert!(retried.success);
    assert_eq!(retried.context.original_status, Some(401));
    assert_eq!(
        retried.parameters.get("pid").map(String::as_str),
        Some("https://ror.org/04dkp9463")
    );
    assert_eq!(retried.response_summary.as_ref().map(|s| s.returned_results), Some(1));
    assert!(!entries[1].success);
    assert!(entries.windows(2).all(|pair| pair[0].request_id != pair[1].request_id));
}
