//! Shared helpers for gateway integration tests.
//!
//! Every test gets its own `MockServer` with the token endpoint mounted at
//! `/oidc/token` and the graph API under `/graph/v1/`.

use research_monitor_config::ApiConfig;
use research_monitor_gateway::{
    GatewayClient,
    RequestLog,
};
use secrecy::SecretString;
use std::{
    path::Path,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
    },
};
use url::Url;
#[allow(unused_imports)]
pub use wiremock::{
    matchers::{
        body_string_contains,
        header,
        method,
        path,
        query_param,
    },
    Mock,
    MockServer,
    ResponseTemplate,
};

pub const TOKEN_PATH: &str = "/oidc/token";

pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        base_url: Url::parse(&format!("{}/graph/v1", server.uri())).unwrap(),
        auth_url: Url::parse(&format!("{}{TOKEN_PATH}", server.uri())).unwrap(),
        client_id: "monitor".to_string(),
        client_secret: SecretString::new("s3cret".to_string().into()),
        timeout_secs: 5,
    }
}

#[allow(dead_code)]
pub fn client(server: &MockServer) -> GatewayClient {
    GatewayClient::new(&api_config(server), RequestLog::disabled()).unwrap()
}

#[allow(dead_code)]
pub fn client_logging_to(server: &MockServer, logs_dir: &Path) -> GatewayClient {
    GatewayClient::new(&api_config(server), RequestLog::in_dir(logs_dir)).unwrap()
}

/// Token endpoint handing out `token-1`, `token-2`, ... with the given lifetime.
/// Returns the number of exchanges performed so far.
#[allow(dead_code)]
pub async fn mount_token_endpoint(server: &MockServer, expires_in: i64) -> Arc<AtomicUsize> {
    let exchanges = Arc::new(AtomicUsize::new(0));
    let counter = exchanges.clone();
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(move |_req: &wiremock::Request| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": format!("token-{n}"),
                "expires_in": expires_in,
                "token_type": "Bearer",
            }))
        })
        .mount(server)
        .await;
    exchanges
}

#[allow(dead_code)]
pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
