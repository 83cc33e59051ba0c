//! Authentication service
//!
//! Composes the credential, password, token and refresh components into the
//! request-level flows: login, protected request, refresh, revoke and the
//! payment webhook check.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::auth::credentials::{ApiKeyVerifier, Headers, bearer_token};
use crate::auth::jwt::{TokenIssuer, TokenValidator};
use crate::auth::password::PasswordHasher;
use crate::auth::refresh::{MemoryRefreshTokenStore, RefreshTokenService, RefreshTokenStore};
use crate::auth::types::{RefreshGrant, TokenPair};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Token type reported alongside issued tokens.
pub const TOKEN_TYPE_BEARER: &str = "Bearer";

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    issuer: TokenIssuer,
    validator: TokenValidator,
    passwords: PasswordHasher,
    webhook_key: ApiKeyVerifier,
    refresh_tokens: RefreshTokenService,
    /// 默认访问令牌有效期，同时也是上限
    access_ttl: Duration,
}

impl AuthService {
    /// Build the service from a validated config and a refresh-token store.
    pub fn new(config: &AuthConfig, store: Arc<dyn RefreshTokenStore>) -> Result<Self> {
        config.validate().map_err(AuthError::config)?;

        let issuer = TokenIssuer::new(&config.jwt_secret);
        Ok(Self {
            validator: TokenValidator::new(&config.jwt_secret),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            webhook_key: ApiKeyVerifier::new(&config.polka_key),
            refresh_tokens: RefreshTokenService::new(store, issuer.clone(), config),
            issuer,
            access_ttl: config.access_token_ttl(),
        })
    }

    /// 使用内存刷新令牌存储创建服务
    pub fn in_memory(config: &AuthConfig) -> Result<Self> {
        Self::new(config, Arc::new(MemoryRefreshTokenStore::new()))
    }

    /// Access-token lifetime for a login that asked for `requested` seconds.
    ///
    /// A request is honoured only when it is positive and shorter than the
    /// configured lifetime; anything else gets the configured lifetime.
    #[must_use]
    pub fn access_token_lifetime(&self, requested: Option<u64>) -> Duration {
        match requested {
            Some(secs) if secs > 0 && secs < self.access_ttl.as_secs() => Duration::from_secs(secs),
            _ => self.access_ttl,
        }
    }

    /// Hash a new account password for storage.
    pub fn hash_password(&self, plaintext: &str) -> Result<String> {
        self.passwords.hash(plaintext)
    }

    /// Verify a password and issue an access/refresh token pair.
    ///
    /// The caller looks the account up and passes its stored hash.
    pub async fn login(
        &self,
        user_id: Uuid,
        password: &str,
        stored_hash: &str,
        expires_in_seconds: Option<u64>,
    ) -> Result<TokenPair> {
        if let Err(e) = self.passwords.verify(password, stored_hash) {
            tracing::warn!(user_id = %user_id, "login rejected: password mismatch");
            return Err(e);
        }

        let lifetime = self.access_token_lifetime(expires_in_seconds);
        let access_token = self.issuer.issue(user_id, lifetime)?;
        let refresh_token = self.refresh_tokens.issue(user_id).await?;

        tracing::info!(user_id = %user_id, expires_in = lifetime.as_secs(), "user logged in");

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: lifetime.as_secs(),
        })
    }

    /// Authenticate a protected request and return its principal.
    pub fn authenticate(&self, headers: &Headers) -> Result<Uuid> {
        let token = bearer_token(headers)?;
        Ok(self.validator.validate(&token)?)
    }

    /// Exchange the refresh token in `headers` for a new access token.
    pub async fn refresh(&self, headers: &Headers) -> Result<RefreshGrant> {
        let token = bearer_token(headers)?;
        self.refresh_tokens.exchange(&token).await
    }

    /// Revoke the refresh token in `headers`.
    pub async fn revoke(&self, headers: &Headers) -> Result<()> {
        let token = bearer_token(headers)?;
        self.refresh_tokens.revoke(&token).await
    }

    /// Check the payment webhook's `ApiKey` credential.
    pub fn authorize_webhook(&self, headers: &Headers) -> Result<()> {
        self.webhook_key.verify(headers)
    }

    /// Revoke expired refresh tokens; intended for a periodic task.
    pub async fn sweep_expired_refresh_tokens(&self) -> Result<usize> {
        self.refresh_tokens.sweep_expired().await
    }

    /// 访问令牌签发器
    #[must_use]
    pub const fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// 访问令牌校验器
    #[must_use]
    pub const fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    /// 刷新令牌服务
    #[must_use]
    pub const fn refresh_tokens(&self) -> &RefreshTokenService {
        &self.refresh_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TokenRejection;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn config() -> AuthConfig {
        let mut config = AuthConfig::new("service-test-secret", "f271c81ff7084ee5b99a5091b42d486e");
        config.bcrypt_cost = 4;
        config
    }

    fn service() -> AuthService {
        AuthService::in_memory(&config()).unwrap()
    }

    fn bearer(token: &str) -> Headers {
        [("Authorization", format!("Bearer {token}"))].into_iter().collect()
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = AuthConfig::new("", "polka");
        assert!(matches!(
            AuthService::in_memory(&config),
            Err(AuthError::Config { .. })
        ));
    }

    #[rstest]
    #[case(None, 3600)]
    #[case(Some(0), 3600)]
    #[case(Some(1), 1)]
    #[case(Some(60), 60)]
    #[case(Some(3599), 3599)]
    #[case(Some(3600), 3600)]
    #[case(Some(86_400), 3600)]
    fn test_access_token_lifetime_clamp(#[case] requested: Option<u64>, #[case] expected: u64) {
        assert_eq!(
            service().access_token_lifetime(requested),
            Duration::from_secs(expected)
        );
    }

    #[tokio::test]
    async fn test_login_then_authenticate() {
        let service = service();
        let user_id = Uuid::new_v4();
        let stored = service.hash_password("04234").unwrap();

        let pair = service.login(user_id, "04234", &stored, Some(60)).await.unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 60);
        assert_eq!(pair.refresh_token.len(), 64);
        assert_eq!(service.authenticate(&bearer(&pair.access_token)).unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let service = service();
        let stored = service.hash_password("04234").unwrap();

        let result = service.login(Uuid::new_v4(), "wrong", &stored, None).await;
        assert!(matches!(result, Err(AuthError::PasswordMismatch)));
    }

    #[test]
    fn test_authenticate_without_header() {
        let service = service();
        assert!(matches!(
            service.authenticate(&Headers::new()),
            Err(AuthError::MissingCredential)
        ));
    }

    #[test]
    fn test_authenticate_with_garbage_token() {
        let service = service();
        match service.authenticate(&bearer("not-a-jwt")) {
            Err(AuthError::InvalidToken(e)) => assert_eq!(e.reason(), TokenRejection::Malformed),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_token_is_not_an_access_token() {
        let service = service();
        let stored = service.hash_password("pw").unwrap();
        let pair = service.login(Uuid::new_v4(), "pw", &stored, None).await.unwrap();

        assert!(matches!(
            service.authenticate(&bearer(&pair.refresh_token)),
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_and_revoke() {
        let service = service();
        let user_id = Uuid::new_v4();
        let stored = service.hash_password("pw").unwrap();
        let pair = service.login(user_id, "pw", &stored, None).await.unwrap();

        let grant = service.refresh(&bearer(&pair.refresh_token)).await.unwrap();
        assert_eq!(service.authenticate(&bearer(&grant.access_token)).unwrap(), user_id);

        service.revoke(&bearer(&pair.refresh_token)).await.unwrap();
        assert!(matches!(
            service.refresh(&bearer(&pair.refresh_token)).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[test]
    fn test_authorize_webhook() {
        let service = service();
        let good: Headers = [("Authorization", "ApiKey f271c81ff7084ee5b99a5091b42d486e")]
            .into_iter()
            .collect();
        let bad: Headers = [("Authorization", "ApiKey nope")].into_iter().collect();

        assert!(service.authorize_webhook(&good).is_ok());
        assert!(matches!(
            service.authorize_webhook(&bad),
            Err(AuthError::ApiKeyMismatch)
        ));
        assert!(matches!(
            service.authorize_webhook(&Headers::new()),
            Err(AuthError::MissingCredential)
        ));
    }
}
