//! OAuth2 token endpoint client.
//!
//! # Responsibilities
//! - POST the refresh-token grant as a form
//! - Turn a 200 JSON response into a [`Token`]
//! - Classify every other outcome as a [`TokenError`]

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::auth::token::{now_millis, Token};
use crate::auth::TokenError;
use crate::config::TokenClientConfig;
use crate::context::constants::oauth2;

/// Source of fresh access tokens.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// Exchange the credential parameters for a new token.
    async fn request_token(
        &self,
        token_endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Token, TokenError>;
}

/// Successful token response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Token endpoint reached over HTTP with bounded timeouts.
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    client: reqwest::Client,
}

impl HttpTokenEndpoint {
    pub fn new(config: &TokenClientConfig) -> Result<Self, TokenError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| TokenError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenEndpoint {
    async fn request_token(
        &self,
        token_endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Token, TokenError> {
        tracing::debug!(endpoint = %token_endpoint, "Retrieving new access token from token endpoint");

        let url = url::Url::parse(token_endpoint)
            .map_err(|e| TokenError::InvalidEndpoint(e.to_string()))?;

        let mut form: Vec<(&str, &str)> = Vec::with_capacity(params.len() + 1);
        form.push((oauth2::GRANT_TYPE, oauth2::REFRESH_TOKEN));
        form.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let started_at = now_millis();
        let response = self
            .client
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        if status != reqwest::StatusCode::OK {
            return Err(TokenError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.is_empty() {
            return Err(TokenError::MissingEntity);
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| TokenError::Malformed(e.to_string()))?;
        Ok(Token::new(
            parsed.access_token,
            started_at,
            parsed.expires_in.saturating_mul(1000),
        ))
    }
}

fn classify(err: reqwest::Error) -> TokenError {
    if err.is_timeout() {
        TokenError::Timeout
    } else {
        TokenError::Transport(err.without_url().to_string())
    }
}
