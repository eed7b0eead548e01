//! Exchanging a refresh token for a new access token.
//!
//! The refresher is deliberately a separate client: it owns its own
//! `reqwest::Client` and never goes through the gateway, so a rejected
//! refresh token cannot trigger another refresh.

use std::future::Future;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{ApiError, RefreshFailure};

/// Refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "token/refresh/";

/// Performs the refresh-token exchange.
pub trait TokenRefresher: Send + Sync + 'static {
    /// Exchange `refresh_token` for a new access token.
    fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<SecretString, RefreshFailure>> + Send;
}

impl<R: TokenRefresher> TokenRefresher for Arc<R> {
    fn refresh(
        &self,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<SecretString, RefreshFailure>> + Send {
        (**self).refresh(refresh_token)
    }
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    access: Option<String>,
}

/// [`TokenRefresher`] calling `POST /token/refresh/`.
#[derive(Debug, Clone)]
pub struct HttpRefresher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRefresher {
    /// Create a refresher for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the HTTP client cannot be built or the endpoint
    /// cannot be derived from the base URL.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.base_url.join(REFRESH_PATH)?,
        })
    }
}

impl TokenRefresher for HttpRefresher {
    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<SecretString, RefreshFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&RefreshRequest {
                refresh: refresh_token.expose_secret(),
            })
            .send()
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RefreshFailure::Rejected(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RefreshFailure::Transport(e.to_string()))?;

        parse_refresh_response(&body)
    }
}

/// Pull the new access token out of a successful refresh response.
fn parse_refresh_response(body: &[u8]) -> Result<SecretString, RefreshFailure> {
    let parsed: RefreshResponse =
        serde_json::from_slice(body).map_err(|e| RefreshFailure::Malformed(e.to_string()))?;

    parsed
        .access
        .filter(|token| !token.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| RefreshFailure::Malformed("missing access token".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_response() {
        let token = parse_refresh_response(br#"{"access": "new-access"}"#).unwrap();
        assert_eq!(token.expose_secret(), "new-access");
    }

    #[test]
    fn test_parse_refresh_response_missing_access() {
        assert_eq!(
            parse_refresh_response(br#"{"refresh": "x"}"#).unwrap_err(),
            RefreshFailure::Malformed("missing access token".to_string())
        );
        assert_eq!(
            parse_refresh_response(br#"{"access": ""}"#).unwrap_err(),
            RefreshFailure::Malformed("missing access token".to_string())
        );
        assert!(matches!(
            parse_refresh_response(b"oops"),
            Err(RefreshFailure::Malformed(_))
        ));
    }

    #[test]
    fn test_endpoint_is_joined_onto_base() {
        let config = ClientConfig::for_base_url("http://127.0.0.1:8000").unwrap();
        let refresher = HttpRefresher::new(&config).unwrap();
        assert_eq!(
            refresher.endpoint.as_str(),
            "http://127.0.0.1:8000/token/refresh/"
        );
    }
}
