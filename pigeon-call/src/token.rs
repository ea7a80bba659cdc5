#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use crate::error::CallError;
use anyhow::Context;
use async_trait::async_trait;
use pigeon_protocol::http::ErrorResponse;
use pigeon_protocol::http::token::{TOKEN_ENDPOINT_PATH, TokenRequest, TokenResponse};
use std::time::Duration;
use tracing::instrument;

/// Default timeout for requests against the token endpoint.
/// Can be overwritten using [`HttpTokenSource::with_timeout`].
const TOKEN_DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of room access tokens.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    async fn fetch_token(&self, request: &TokenRequest) -> Result<String, CallError>;
}

/// Fetches tokens from the token issuer's HTTP endpoint.
pub struct HttpTokenSource {
    client: reqwest::Client,
    token_endpoint_url: String,
}

impl HttpTokenSource {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        Self::with_timeout(base_url, TOKEN_DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::ClientBuilder::new()
                .timeout(timeout)
                .build()
                .context("Failed to create HTTP client")?,
            token_endpoint_url: format!(
                "{}{TOKEN_ENDPOINT_PATH}",
                base_url.trim_end_matches('/')
            ),
        })
    }
}

#[async_trait]
impl TokenSource for HttpTokenSource {
    #[instrument(level = "debug", skip_all, fields(identity = %request.identity, room_name = %request.room_name), err)]
    async fn fetch_token(&self, request: &TokenRequest) -> Result<String, CallError> {
        tracing::trace!("Performing HTTP token request");
        let response = self
            .client
            .post(&self.token_endpoint_url)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                tracing::debug!(?err, "Failed to perform HTTP token request");
                CallError::TokenAcquisition(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::trace!(status = status.as_u16(), "Received non-success HTTP status");
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(CallError::TokenAcquisition(message));
        }

        let body = response.json::<TokenResponse>().await.map_err(|err| {
            tracing::debug!(?err, "Failed to parse token response");
            CallError::TokenAcquisition("Malformed token response".to_string())
        })?;

        if body.token.is_empty() {
            return Err(CallError::TokenAcquisition(
                "Token response did not contain a token".to_string(),
            ));
        }

        tracing::trace!("HTTP token request succeeded");
        Ok(body.token)
    }
}
