use crate::{
    client::GatewayClient,
    error::{
        classify,
        AuthError,
    },
    request_log::RequestContext,
};
use chrono::{
    DateTime,
    Utc,
};
use secrecy::{
    ExposeSecret as _,
    SecretString,
};
use serde::Deserialize;
use std::time::Instant;

/// Lifetime assumed when the token endpoint does not declare one.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
/// Subtracted from the declared lifetime so a token is renewed before the server rejects it.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 300;

/// A bearer token and the instant from which it is no longer used.
#[derive(Clone, Debug)]
pub struct AccessToken {
    secret: SecretString,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn issued_at(secret: SecretString, expires_in: Option<i64>, now: DateTime<Utc>) -> Self {
        let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        let expires_at = chrono::Duration::try_seconds(lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS))
            .and_then(|valid_for| now.checked_add_signed(valid_for))
            .unwrap_or(now);
        Self { secret, expires_at }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl GatewayClient {
    /// Returns the cached token while it is valid, otherwise performs a
    /// client-credentials exchange. The token lock is held for the whole
    /// exchange, so at most one exchange is in flight.
    #[instrument(level = "debug", skip(self))]
    pub async fn access_token(&self) -> Result<SecretString, AuthError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired_at(Utc::now())) {
            return Ok(token.secret.clone());
        }

        info!("Requesting new access token...");
        let token = self.exchange_token().await.inspect_err(|err| {
            error!("Failed to get access token: {err}");
        })?;
        debug!(expires_at = %token.expires_at, "Access token obtained successfully");
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }

    /// Forgets the cached token; the next call to [`Self::access_token`] exchanges a new one.
    pub async fn invalidate_token(&self) {
        self.token.lock().await.take();
    }

    async fn exchange_token(&self) -> Result<AccessToken, AuthError> {
        let params = [("grant_type", "client_credentials".to_string())];
        let context = RequestContext::new("get_access_token").tag("token_refresh", true);
        let entry = self.request_log.entry("POST", &self.auth_url, &params, &context);
        let started = Instant::now();

        let result = async {
            let response = self
                .http
                .post(self.auth_url.clone())
                .basic_auth(
                    &self.credentials.client_id,
                    Some(self.credentials.client_secret.expose_secret()),
                )
                .form(&params)
                .timeout(self.timeout)
                .send()
                .await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        }
        .await;

        let (status, body) = match result {
            Ok(response) => response,
            Err(source) => {
                self.request_log
                    .record(&entry.with_error(&source, classify(&source), started.elapsed()));
                return Err(AuthError::Transport(source));
            }
        };
        self.request_log
            .record(&entry.with_response(status, &body, started.elapsed()));

        if status != 200 {
            return Err(AuthError::Status(status));
        }
        let response: TokenResponse = serde_json::from_slice(&body).map_err(AuthError::Malformed)?;
        Ok(AccessToken::issued_at(
            SecretString::new(response.access_token.into()),
            response.expires_in,
            Utc::now(),
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn secret() -> SecretString {
        SecretString::new("token".to_string().into())
    }

    #[test]
    fn expiry_subtracts_the_safety_margin() {
        let now = Utc::now();
        let token = AccessToken::issued_at(secret(), Some(3600), now);
        assert_eq!(token.expires_at(), now + chrono::Duration::seconds(3300));
        assert!(!token.is_expired_at(now + chrono::Duration::seconds(3299)));
        assert!(token.is_expired_at(now + chrono::Duration::seconds(3300)));
    }

    #[test]
    fn missing_lifetime_defaults_to_one_hour() {
        let now = Utc::now();
        let token = AccessToken::issued_at(secret(), None, now);
        assert_eq!(token.expires_at(), now + chrono::Duration::seconds(3300));
    }

    #[test]
    fn out_of_range_lifetime_is_already_expired() {
        let now = Utc::now();
        let token = AccessToken::issued_at(secret(), Some(i64::MAX), now);
        assert_eq!(token.expires_at(), now);
        assert!(token.is_expired_at(now));
    }
}
