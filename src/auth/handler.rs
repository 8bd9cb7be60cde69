//! Refresh-token credential handler.
//!
//! # Responsibilities
//! - Validate connection identity and credential parameters up front
//! - Derive a deterministic cache key per credential set
//! - Serve active tokens from the cache, refresh otherwise
//! - Bridge the flow onto a host [`MessageContext`]

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::auth::endpoint::{HttpTokenEndpoint, TokenEndpoint};
use crate::auth::token::{Token, TokenManager};
use crate::config::TokenClientConfig;
use crate::context::constants::{self, oauth2};
use crate::context::params::{get_parameter, ParamType, ParamValue};
use crate::context::MessageContext;
use crate::error::{ConnectorError, ConnectorResult};
use crate::observability::metrics;

const MANDATORY_PARAMS_MSG: &str =
    "\"clientId\", \"clientSecret\", \"tokenEndpoint\", \"refreshToken\", parameters are mandatory.";

/// OAuth2 client credentials plus the refresh token.
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_token: refresh_token.into(),
        }
    }

    fn has_blank(&self) -> bool {
        [&self.client_id, &self.client_secret, &self.refresh_token]
            .iter()
            .any(|v| v.trim().is_empty())
    }

    /// Form parameters sent alongside `grant_type`.
    pub fn to_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (oauth2::REFRESH_TOKEN.to_string(), self.refresh_token.clone()),
            (oauth2::CLIENT_ID.to_string(), self.client_id.clone()),
            (oauth2::CLIENT_SECRET.to_string(), self.client_secret.clone()),
        ])
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Cache key for a connection and credential set.
///
/// `<connection>_<sha256(token endpoint, params)>`; every field is length
/// prefixed so adjacent values cannot run together.
pub fn token_key(connection: &str, token_endpoint: &str, params: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    feed(&mut hasher, token_endpoint);
    for (name, value) in params {
        feed(&mut hasher, name);
        feed(&mut hasher, value);
    }
    format!("{}_{}", connection, hex::encode(hasher.finalize()))
}

fn feed(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

/// Hands out valid access tokens, refreshing through the token endpoint.
pub struct ClientCredentialsHandler<E = HttpTokenEndpoint> {
    tokens: TokenManager,
    endpoint: E,
    refresh_lock: Mutex<()>,
}

impl ClientCredentialsHandler<HttpTokenEndpoint> {
    /// Create a handler backed by an HTTP token endpoint client.
    pub fn new(tokens: TokenManager, config: &TokenClientConfig) -> ConnectorResult<Self> {
        Ok(Self::with_endpoint(tokens, HttpTokenEndpoint::new(config)?))
    }
}

impl<E: TokenEndpoint> ClientCredentialsHandler<E> {
    pub fn with_endpoint(tokens: TokenManager, endpoint: E) -> Self {
        Self {
            tokens,
            endpoint,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    /// Return an active access token for the connection, refreshing if needed.
    pub async fn get_valid_token(
        &self,
        connection: &str,
        credentials: &Credentials,
        token_endpoint: &str,
    ) -> ConnectorResult<String> {
        if connection.trim().is_empty() {
            return Err(ConnectorError::Config(format!(
                "Parameter {} is not provided",
                constants::CONNECTION_NAME
            )));
        }
        if credentials.has_blank() || token_endpoint.trim().is_empty() {
            return Err(ConnectorError::Config(MANDATORY_PARAMS_MSG.to_string()));
        }

        let params = credentials.to_params();
        let key = token_key(connection, token_endpoint, &params);

        match self.tokens.get_token(&key) {
            Some(token) if token.is_active() => {
                metrics::record_token_request("hit");
                return Ok(token.access_token().to_string());
            }
            Some(_) => {
                tracing::debug!(connection, "Access token is inactive");
                self.tokens.remove_if_inactive(&key);
            }
            None => {
                tracing::debug!(connection, "Token does not exist in token store");
            }
        }

        let token = self.get_and_add_new_token(connection, &key, token_endpoint, &params).await?;
        Ok(token.access_token().to_string())
    }

    /// Resolve credentials from the message, store base URL and access token on it.
    ///
    /// Failures are also reported on the message as error code and message.
    pub async fn connect(&self, ctx: &mut dyn MessageContext) -> ConnectorResult<()> {
        let result = self.connect_inner(ctx).await;
        if let Err(e) = &result {
            ctx.report_error(e.code(), &e.error_message());
        }
        result
    }

    async fn connect_inner(&self, ctx: &mut dyn MessageContext) -> ConnectorResult<()> {
        let connection = string_param(&*ctx, constants::CONNECTION_NAME)?;

        if let Some(base) = string_param(&*ctx, constants::BASE)? {
            let base = base.strip_suffix('/').unwrap_or(&base).to_string();
            ctx.set_property(constants::PROPERTY_BASE, base);
        }

        let credentials = Credentials::new(
            string_param(&*ctx, constants::CLIENT_ID)?.unwrap_or_default(),
            string_param(&*ctx, constants::CLIENT_SECRET)?.unwrap_or_default(),
            string_param(&*ctx, constants::REFRESH_TOKEN)?.unwrap_or_default(),
        );
        let token_endpoint = string_param(&*ctx, constants::TOKEN_ENDPOINT)?.unwrap_or_default();

        let access_token = self
            .get_valid_token(&connection.unwrap_or_default(), &credentials, &token_endpoint)
            .await?;
        ctx.set_property(constants::PROPERTY_ACCESS_TOKEN, access_token);
        Ok(())
    }

    /// Refresh under the handler lock and cache the result.
    async fn get_and_add_new_token(
        &self,
        connection: &str,
        key: &str,
        token_endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> ConnectorResult<Token> {
        let _guard = self.refresh_lock.lock().await;

        // Whoever held the lock before us may have refreshed this key already.
        if let Some(token) = self.tokens.get_token(key).filter(Token::is_active) {
            metrics::record_token_request("hit");
            return Ok(token);
        }

        match self.endpoint.request_token(token_endpoint, params).await {
            Ok(token) => {
                self.tokens.add_token(key, token.clone());
                metrics::record_token_request("refresh");
                tracing::info!(connection, ttl_ms = token.ttl_ms(), "Access token refreshed");
                Ok(token)
            }
            Err(e) => {
                metrics::record_token_request("error");
                tracing::warn!(connection, error = %e, "Failed to refresh access token");
                Err(e.into())
            }
        }
    }
}

fn string_param(ctx: &dyn MessageContext, name: &str) -> ConnectorResult<Option<String>> {
    Ok(get_parameter(ctx, name, ParamType::String, true)?.and_then(ParamValue::into_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::now_millis;
    use crate::auth::TokenError;
    use crate::context::SimpleContext;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    const ENDPOINT: &str = "https://auth.example.com/oauth2/token";

    #[derive(Default)]
    struct FakeEndpoint {
        calls: AtomicUsize,
        fail_with: Option<u16>,
        ttl_ms: u64,
        delay: Duration,
    }

    impl FakeEndpoint {
        fn ok(ttl_ms: u64) -> Self {
            Self {
                ttl_ms,
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenEndpoint for FakeEndpoint {
        async fn request_token(
            &self,
            _token_endpoint: &str,
            params: &BTreeMap<String, String>,
        ) -> Result<Token, TokenError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if let Some(status) = self.fail_with {
                return Err(TokenError::Status {
                    status,
                    body: "{\"error\":\"invalid_grant\"}".into(),
                });
            }
            assert!(params.contains_key("refresh_token"));
            Ok(Token::new(format!("token-{}", n), now_millis(), self.ttl_ms))
        }
    }

    fn creds() -> Credentials {
        Credentials::new("client", "secret", "refresh")
    }

    #[test]
    fn test_token_key_is_deterministic() {
        let a = token_key("crm", ENDPOINT, &creds().to_params());
        let b = token_key("crm", ENDPOINT, &creds().to_params());
        assert_eq!(a, b);
        assert!(a.starts_with("crm_"));
    }

    #[test]
    fn test_token_key_differs_per_input() {
        let base = token_key("crm", ENDPOINT, &creds().to_params());

        let other_secret = Credentials::new("client", "secret2", "refresh");
        assert_ne!(base, token_key("crm", ENDPOINT, &other_secret.to_params()));
        assert_ne!(base, token_key("crm", "https://other/token", &creds().to_params()));
        assert_ne!(base, token_key("erp", ENDPOINT, &creds().to_params()));

        // Shifting characters between fields must not collide.
        let shifted = Credentials::new("clien", "tsecret", "refresh");
        assert_ne!(base, token_key("crm", ENDPOINT, &shifted.to_params()));
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let debug = format!("{:?}", creds());
        assert!(debug.contains("client"));
        assert!(!debug.contains("secret\""));
        assert!(!debug.contains("refresh\""));
    }

    #[tokio::test]
    async fn test_missing_secret_fails_before_network() {
        let handler = ClientCredentialsHandler::with_endpoint(TokenManager::new(), FakeEndpoint::ok(60_000));

        let missing = Credentials::new("client", "  ", "refresh");
        let err = handler.get_valid_token("crm", &missing, ENDPOINT).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        assert_eq!(err.code(), "701002");
        assert_eq!(handler.endpoint().calls(), 0);

        let err = handler.get_valid_token("crm", &creds(), "").await.unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        let err = handler.get_valid_token("", &creds(), ENDPOINT).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        assert_eq!(handler.endpoint().calls(), 0);
    }

    #[tokio::test]
    async fn test_cached_token_is_reused() {
        let handler = ClientCredentialsHandler::with_endpoint(TokenManager::new(), FakeEndpoint::ok(60_000));

        let first = handler.get_valid_token("crm", &creds(), ENDPOINT).await.unwrap();
        let second = handler.get_valid_token("crm", &creds(), ENDPOINT).await.unwrap();
        assert_eq!(first, "token-0");
        assert_eq!(second, "token-0");
        assert_eq!(handler.endpoint().calls(), 1);
        assert_eq!(handler.tokens().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_is_replaced() {
        let tokens = TokenManager::new();
        let handler = ClientCredentialsHandler::with_endpoint(tokens.clone(), FakeEndpoint::ok(60_000));

        let key = token_key("crm", ENDPOINT, &creds().to_params());
        tokens.add_token(key.clone(), Token::new("old", 0, 1));

        let token = handler.get_valid_token("crm", &creds(), ENDPOINT).await.unwrap();
        assert_eq!(token, "token-0");
        assert_eq!(tokens.get_token(&key).unwrap().access_token(), "token-0");
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_no_entry() {
        let tokens = TokenManager::new();
        let endpoint = FakeEndpoint {
            fail_with: Some(400),
            ..FakeEndpoint::default()
        };
        let handler = ClientCredentialsHandler::with_endpoint(tokens.clone(), endpoint);

        let key = token_key("crm", ENDPOINT, &creds().to_params());
        tokens.add_token(key.clone(), Token::new("old", 0, 1));

        let err = handler.get_valid_token("crm", &creds(), ENDPOINT).await.unwrap_err();
        assert_eq!(err.code(), "701003");
        assert!(err.to_string().contains("400"));
        assert!(!err.to_string().contains("secret"));
        assert!(tokens.get_token(&key).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_requests_refresh_once() {
        let endpoint = FakeEndpoint {
            ttl_ms: 60_000,
            delay: Duration::from_millis(50),
            ..FakeEndpoint::default()
        };
        let handler = Arc::new(ClientCredentialsHandler::with_endpoint(TokenManager::new(), endpoint));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = Arc::clone(&handler);
                tokio::spawn(async move { handler.get_valid_token("crm", &creds(), ENDPOINT).await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "token-0");
        }
        assert_eq!(handler.endpoint().calls(), 1);
    }

    #[tokio::test]
    async fn test_connect_sets_properties() {
        let handler = ClientCredentialsHandler::with_endpoint(TokenManager::new(), FakeEndpoint::ok(60_000));
        let mut ctx = SimpleContext::new()
            .with_parameter(constants::CONNECTION_NAME, "crm")
            .with_parameter(constants::BASE, "https://api.example.com/v2/")
            .with_parameter(constants::CLIENT_ID, "client")
            .with_parameter(constants::CLIENT_SECRET, "secret")
            .with_parameter(constants::REFRESH_TOKEN, "refresh")
            .with_parameter(constants::TOKEN_ENDPOINT, ENDPOINT);

        handler.connect(&mut ctx).await.unwrap();
        assert_eq!(
            ctx.property(constants::PROPERTY_BASE).as_deref(),
            Some("https://api.example.com/v2")
        );
        assert_eq!(ctx.property(constants::PROPERTY_ACCESS_TOKEN).as_deref(), Some("token-0"));
        assert!(ctx.property(constants::PROPERTY_ERROR_CODE).is_none());
    }

    #[tokio::test]
    async fn test_connect_reports_config_error() {
        let handler = ClientCredentialsHandler::with_endpoint(TokenManager::new(), FakeEndpoint::ok(60_000));
        let mut ctx = SimpleContext::new()
            .with_parameter(constants::CONNECTION_NAME, "crm")
            .with_parameter(constants::CLIENT_ID, "client")
            .with_parameter(constants::REFRESH_TOKEN, "refresh")
            .with_parameter(constants::TOKEN_ENDPOINT, ENDPOINT);

        assert!(handler.connect(&mut ctx).await.is_err());
        assert_eq!(ctx.property(constants::PROPERTY_ERROR_CODE).as_deref(), Some("701002"));
        let message = ctx.property(constants::PROPERTY_ERROR_MESSAGE).unwrap();
        assert!(message.starts_with("Connector encountered an error: "));
        assert!(message.contains("parameters are mandatory"));
        assert!(ctx.property(constants::PROPERTY_ACCESS_TOKEN).is_none());
        assert_eq!(handler.endpoint().calls(), 0);
    }
}
