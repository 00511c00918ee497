use crate::{
    auth::AccessToken,
    error::{
        classify,
        RequestError,
    },
    payload::Payload,
    request_log::{
        RequestContext,
        RequestLog,
    },
};
use research_monitor_config::ApiConfig;
use reqwest::header::{
    HeaderValue,
    CONTENT_TYPE,
};
use secrecy::{
    ExposeSecret as _,
    SecretString,
};
use std::time::{
    Duration,
    Instant,
};
use tokio::sync::Mutex;
use url::Url;

/// OAuth2 client-credentials pair used against the token endpoint.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

/// Authenticated access to the research-metadata gateway.
///
/// The client owns its bearer token. Refreshes are serialized through the
/// token mutex, so concurrent callers never trigger more than one exchange at
/// a time. Every HTTP attempt is recorded in the [`RequestLog`].
#[derive(Debug)]
pub struct GatewayClient {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) auth_url: Url,
    pub(crate) credentials: ClientCredentials,
    pub(crate) token: Mutex<Option<AccessToken>>,
    pub(crate) request_log: RequestLog,
    pub(crate) timeout: Duration,
}

impl GatewayClient {
    pub fn new(api: &ApiConfig, request_log: RequestLog) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .timeout(api.timeout())
            .build()
            .map_err(RequestError::Client)?;

        Ok(Self {
            http,
            base_url: api.normalized_base_url(),
            auth_url: api.auth_url.clone(),
            credentials: ClientCredentials {
                client_id: api.client_id.clone(),
                client_secret: api.client_secret.clone(),
            },
            token: Default::default(),
            request_log,
            timeout: api.timeout(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn request_log(&self) -> &RequestLog {
        &self.request_log
    }

    pub fn endpoint(&self, name: &str) -> Result<Url, RequestError> {
        Ok(self.base_url.join(name)?)
    }

    /// Authenticated GET returning the decoded payload.
    ///
    /// An HTTP 401 invalidates the cached token, refreshes it once and retries
    /// the call exactly once. Any other non-200 status or transport error is
    /// returned as is.
    #[instrument(level = "debug", skip(self, params, context), fields(operation = %context.operation))]
    pub async fn request(
        &self,
        url: &Url,
        params: &[(&str, String)],
        context: RequestContext,
    ) -> Result<Payload, RequestError> {
        let started = Instant::now();
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => {
                let entry = self
                    .request_log
                    .entry("GET", url, params, &context)
                    .with_error("No access token available", "AuthError", started.elapsed());
                self.request_log.record(&entry);
                return Err(err.into());
            }
        };

        let (status, body) = self.attempt(url, params, &token, &context).await?;
        match status {
            200 => decode(url, &body),
            401 => {
                info!(%url, "token appears expired, attempting refresh");
                self.invalidate_token().await;
                let token = self.access_token().await?;
                let (status, body) = self.attempt(url, params, &token, &context.retry(401)).await?;
                if status == 200 {
                    decode(url, &body)
                } else {
                    error!(%url, status, "request failed after token refresh");
                    Err(RequestError::Status {
                        url: url.clone(),
                        status,
                        retried: true,
                    })
                }
            }
            status => {
                error!(%url, status, body = %String::from_utf8_lossy(&body[..body.len().min(200)]), "API request failed");
                Err(RequestError::Status {
                    url: url.clone(),
                    status,
                    retried: false,
                })
            }
        }
    }

    /// One logged GET. Transport failures are logged and returned; any received
    /// status is handed back to the caller.
    async fn attempt(
        &self,
        url: &Url,
        params: &[(&str, String)],
        token: &SecretString,
        context: &RequestContext,
    ) -> Result<(u16, Vec<u8>), RequestError> {
        let entry = self.request_log.entry("GET", url, params, context);
        let started = Instant::now();

        let result = async {
            let response = self
                .http
                .get(url.clone())
                .bearer_auth(token.expose_secret())
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .query(params)
                .timeout(self.timeout)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        }
        .await;

        match result {
            Ok((status, body)) => {
                self.request_log
                    .record(&entry.with_response(status, &body, started.elapsed()));
                Ok((status, body))
            }
            Err(source) => {
                self.request_log
                    .record(&entry.with_error(&source, classify(&source), started.elapsed()));
                Err(RequestError::Transport {
                    url: url.clone(),
                    source,
                })
            }
        }
    }
}

fn decode(url: &Url, body: &[u8]) -> Result<Payload, RequestError> {
    serde_json::from_slice::<serde_json::Value>(body)
        .map(Payload::from)
        .map_err(|source| RequestError::Decode {
            url: url.clone(),
            source,
        })
}
