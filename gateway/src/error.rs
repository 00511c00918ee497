use url::Url;

/// The client-credentials exchange against the token endpoint failed.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("token endpoint could not be reached: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("token endpoint answered with HTTP {0}")]
    Status(u16),
    #[error("token response is malformed: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// An authenticated call failed after its retry budget was used up.
#[derive(thiserror::Error, Debug)]
pub enum RequestError {
    #[error("no access token available: {0}")]
    Auth(#[from] AuthError),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to {url} failed with HTTP {status} (retried: {retried})")]
    Status { url: Url, status: u16, retried: bool },
    #[error("response from {url} is not valid JSON: {source}")]
    Decode {
        url: Url,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("failed to build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl RequestError {
    /// True when the call received a 401 again after refreshing the token.
    pub fn is_unauthorized_after_retry(&self) -> bool {
        matches!(self, Self::Status { status: 401, retried: true, .. })
    }
}

/// Short classification recorded as `error_type` in the request log.
pub(crate) fn classify(error: &reqwest::Error) -> &'static str {
    if error.is_timeout() {
        "Timeout"
    } else if error.is_connect() {
        "ConnectionError"
    } else if error.is_decode() {
        "DecodeError"
    } else if error.is_body() {
        "BodyError"
    } else {
        "RequestError"
    }
}
