//! # 刷新令牌生命周期
//!
//! Refresh tokens are opaque random strings validated only by store lookup.
//! The store owns their state; this module defines the contract a store must
//! honour, an in-memory implementation of it and the service that issues,
//! exchanges and revokes tokens.
//!
//! State machine: `Active` → `Revoked` (terminal). A token past `expires_at`
//! that nobody revoked yet reports `Expired` and is treated like a revoked one;
//! [`RefreshTokenStore::revoke_expired`] moves it to `Revoked`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::jwt::TokenIssuer;
use crate::auth::types::RefreshGrant;
use crate::auth::utils::AuthUtils;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Random bytes per refresh token before hex encoding.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// What happens to a refresh token when it is exchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    /// The same token keeps working until it expires or is revoked.
    #[default]
    Reuse,
    /// The token is revoked and a replacement returned with the access token.
    Rotate,
}

/// 刷新令牌状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTokenState {
    /// 可兑换
    Active,
    /// 已过期但尚未被清理
    Expired,
    /// 已撤销，终态
    Revoked,
}

/// A persisted refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshToken {
    /// SHA-256 hex digest of the token string
    pub token_hash: String,
    /// 所属用户
    pub user_id: Uuid,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
    /// 过期时间
    pub expires_at: DateTime<Utc>,
    /// Set once, never cleared
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshToken {
    /// Record for a freshly issued token.
    #[must_use]
    pub fn new(token_hash: String, user_id: Uuid, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            token_hash,
            user_id,
            created_at: now,
            updated_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            revoked_at: None,
        }
    }

    /// 在给定时刻的状态
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }

    fn revoke(&mut self, at: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(at);
            self.updated_at = at;
        }
    }
}

/// Replacement token handed to [`RefreshTokenStore::redeem`] under rotation.
///
/// The owner is filled in by the store from the token being redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedToken {
    /// SHA-256 hex digest of the replacement token
    pub token_hash: String,
    /// 替换令牌有效期
    pub ttl: chrono::Duration,
}

/// Persistence contract for refresh tokens.
///
/// Implementations must serialize `redeem` and `revoke` per token: once
/// `revoke` has returned, no `redeem` of that token may succeed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new token.
    async fn insert(&self, token: RefreshToken) -> Result<()>;

    /// Look a token up by hash.
    async fn find(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    /// Return the owner if the token is active at `now`, else `None`.
    ///
    /// With `rotate_to`, the redeemed token is revoked and the replacement
    /// stored for the same owner in the same atomic step.
    async fn redeem(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        rotate_to: Option<RotatedToken>,
    ) -> Result<Option<Uuid>>;

    /// Mark a token revoked. Returns `false` when the hash is unknown.
    ///
    /// Revoking an already revoked token keeps the first `revoked_at`.
    async fn revoke(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool>;

    /// Revoke every unrevoked token whose expiry is at or before `now`.
    async fn revoke_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}

/// In-memory store; a single lock serializes every mutation.
#[derive(Debug, Clone, Default)]
pub struct MemoryRefreshTokenStore {
    tokens: Arc<RwLock<HashMap<String, RefreshToken>>>,
}

impl MemoryRefreshTokenStore {
    /// 创建空存储
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn insert(&self, token: RefreshToken) -> Result<()> {
        let mut tokens = self.tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(AuthError::store("refresh token already exists"));
        }
        tokens.insert(token.token_hash.clone(), token);
        Ok(())
    }

    async fn find(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token_hash).cloned())
    }

    async fn redeem(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
        rotate_to: Option<RotatedToken>,
    ) -> Result<Option<Uuid>> {
        let mut tokens = self.tokens.write().await;

        let user_id = match tokens.get(token_hash) {
            Some(record) if record.state_at(now) == RefreshTokenState::Active => record.user_id,
            _ => return Ok(None),
        };

        if let Some(next) = rotate_to {
            if tokens.contains_key(&next.token_hash) {
                return Err(AuthError::store("refresh token already exists"));
            }
            if let Some(record) = tokens.get_mut(token_hash) {
                record.revoke(now);
            }
            let replacement = RefreshToken::new(next.token_hash, user_id, now, next.ttl);
            tokens.insert(replacement.token_hash.clone(), replacement);
        }

        Ok(Some(user_id))
    }

    async fn revoke(&self, token_hash: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tokens = self.tokens.write().await;
        let Some(record) = tokens.get_mut(token_hash) else {
            return Ok(false);
        };
        record.revoke(at);
        Ok(true)
    }

    async fn revoke_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut tokens = self.tokens.write().await;
        let mut swept = 0;
        for record in tokens.values_mut() {
            if record.state_at(now) == RefreshTokenState::Expired {
                record.revoke(now);
                swept += 1;
            }
        }
        Ok(swept)
    }
}

/// Issues, exchanges and revokes refresh tokens.
#[derive(Clone)]
pub struct RefreshTokenService {
    store: Arc<dyn RefreshTokenStore>,
    issuer: TokenIssuer,
    access_ttl: Duration,
    refresh_ttl: chrono::Duration,
    rotation: RotationPolicy,
}

impl RefreshTokenService {
    /// Create a service over `store`, minting access tokens with `issuer`.
    #[must_use]
    pub fn new(store: Arc<dyn RefreshTokenStore>, issuer: TokenIssuer, config: &AuthConfig) -> Self {
        Self {
            store,
            issuer,
            access_ttl: config.access_token_ttl(),
            refresh_ttl: config.refresh_token_ttl(),
            rotation: config.rotation,
        }
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn RefreshTokenStore> {
        &self.store
    }

    /// 生成随机刷新令牌 (64 hex chars)
    #[must_use]
    pub fn generate_token() -> String {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Issue and persist a refresh token for `user_id`.
    pub async fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_at(user_id, Utc::now()).await
    }

    /// [`Self::issue`] at an explicit instant.
    pub async fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String> {
        let token = Self::generate_token();
        let record = RefreshToken::new(AuthUtils::sha256_hash(&token), user_id, now, self.refresh_ttl);
        self.store.insert(record).await?;

        tracing::info!(user_id = %user_id, "refresh token issued");
        Ok(token)
    }

    /// Exchange an active refresh token for a new access token.
    pub async fn exchange(&self, token: &str) -> Result<RefreshGrant> {
        self.exchange_at(token, Utc::now()).await
    }

    /// [`Self::exchange`] at an explicit instant.
    pub async fn exchange_at(&self, token: &str, now: DateTime<Utc>) -> Result<RefreshGrant> {
        let replacement = match self.rotation {
            RotationPolicy::Reuse => None,
            RotationPolicy::Rotate => Some(Self::generate_token()),
        };
        let rotate_to = replacement.as_ref().map(|next| RotatedToken {
            token_hash: AuthUtils::sha256_hash(next),
            ttl: self.refresh_ttl,
        });

        let Some(user_id) = self
            .store
            .redeem(&AuthUtils::sha256_hash(token), now, rotate_to)
            .await?
        else {
            tracing::debug!(
                token = %AuthUtils::sanitize_token_for_logging(token),
                "refresh token rejected"
            );
            return Err(AuthError::RefreshTokenInvalid);
        };

        let access_token = self.issuer.issue_at(user_id, self.access_ttl, now)?;
        tracing::info!(user_id = %user_id, rotated = replacement.is_some(), "refresh token exchanged");

        Ok(RefreshGrant {
            access_token,
            refresh_token: replacement,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Revoke a refresh token; later exchanges fail permanently.
    pub async fn revoke(&self, token: &str) -> Result<()> {
        self.revoke_at(token, Utc::now()).await
    }

    /// [`Self::revoke`] at an explicit instant.
    pub async fn revoke_at(&self, token: &str, now: DateTime<Utc>) -> Result<()> {
        if self.store.revoke(&AuthUtils::sha256_hash(token), now).await? {
            tracing::info!("refresh token revoked");
            Ok(())
        } else {
            Err(AuthError::RefreshTokenInvalid)
        }
    }

    /// Revoke every expired token. Returns how many were swept.
    pub async fn sweep_expired(&self) -> Result<usize> {
        let swept = self.store.revoke_expired(Utc::now()).await?;
        if swept > 0 {
            tracing::info!(swept, "expired refresh tokens revoked");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::TokenValidator;
    use crate::config::SigningSecret;
    use chrono::TimeDelta;

    fn setup(rotation: RotationPolicy) -> (RefreshTokenService, TokenValidator, MemoryRefreshTokenStore) {
        let mut config = AuthConfig::new("refresh-test-secret", "polka");
        config.rotation = rotation;
        let secret = SigningSecret::from("refresh-test-secret");
        let store = MemoryRefreshTokenStore::new();
        let service = RefreshTokenService::new(
            Arc::new(store.clone()),
            TokenIssuer::new(&secret),
            &config,
        );
        (service, TokenValidator::new(&secret), store)
    }

    #[test]
    fn test_generate_token_shape() {
        let first = RefreshTokenService::generate_token();
        let second = RefreshTokenService::generate_token();

        assert_eq!(first.len(), REFRESH_TOKEN_BYTES * 2);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_issue_stores_only_hash() {
        let (service, _, store) = setup(RotationPolicy::Reuse);
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        let token = service.issue_at(user_id, now).await.unwrap();

        assert!(store.find(&token).await.unwrap().is_none());
        let record = store.find(&AuthUtils::sha256_hash(&token)).await.unwrap().unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.expires_at, now + TimeDelta::days(60));
        assert_eq!(record.state_at(now), RefreshTokenState::Active);
    }

    #[tokio::test]
    async fn test_exchange_returns_access_token() {
        let (service, validator, _) = setup(RotationPolicy::Reuse);
        let user_id = Uuid::new_v4();

        let token = service.issue(user_id).await.unwrap();
        let grant = service.exchange(&token).await.unwrap();

        assert_eq!(validator.validate(&grant.access_token).unwrap(), user_id);
        assert!(grant.refresh_token.is_none());
        assert_eq!(grant.expires_in, 3600);

        // reuse policy keeps the token usable
        assert!(service.exchange(&token).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoked_token_cannot_be_exchanged() {
        let (service, _, store) = setup(RotationPolicy::Reuse);
        let token = service.issue(Uuid::new_v4()).await.unwrap();

        service.revoke(&token).await.unwrap();

        assert!(matches!(
            service.exchange(&token).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        let record = store.find(&AuthUtils::sha256_hash(&token)).await.unwrap().unwrap();
        assert!(record.revoked_at.is_some());
    }

    #[tokio::test]
    async fn test_revoke_keeps_first_timestamp() {
        let (service, _, store) = setup(RotationPolicy::Reuse);
        let now = Utc::now();
        let token = service.issue_at(Uuid::new_v4(), now).await.unwrap();

        service.revoke_at(&token, now + TimeDelta::seconds(1)).await.unwrap();
        service.revoke_at(&token, now + TimeDelta::seconds(5)).await.unwrap();

        let record = store.find(&AuthUtils::sha256_hash(&token)).await.unwrap().unwrap();
        assert_eq!(record.revoked_at, Some(now + TimeDelta::seconds(1)));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let (service, _, _) = setup(RotationPolicy::Reuse);

        assert!(matches!(
            service.exchange("deadbeef").await,
            Err(AuthError::RefreshTokenInvalid)
        ));
        assert!(matches!(
            service.revoke("deadbeef").await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_cannot_be_exchanged() {
        let (service, _, _) = setup(RotationPolicy::Reuse);
        let issued = Utc::now();
        let token = service.issue_at(Uuid::new_v4(), issued).await.unwrap();

        let before = issued + TimeDelta::days(60) - TimeDelta::seconds(1);
        assert!(service.exchange_at(&token, before).await.is_ok());

        let at_expiry = issued + TimeDelta::days(60);
        assert!(matches!(
            service.exchange_at(&token, at_expiry).await,
            Err(AuthError::RefreshTokenInvalid)
        ));
    }

    #[tokio::test]
    async fn test_rotation_replaces_token() {
        let (service, validator, _) = setup(RotationPolicy::Rotate);
        let user_id = Uuid::new_v4();
        let original = service.issue(user_id).await.unwrap();

        let grant = service.exchange(&original).await.unwrap();
        let rotated = grant.refresh_token.expect("rotation returns a new refresh token");

        assert_ne!(rotated, original);
        assert_eq!(validator.validate(&grant.access_token).unwrap(), user_id);
        assert!(matches!(
            service.exchange(&original).await,
            Err(AuthError::RefreshTokenInvalid)
        ));

        let next = service.exchange(&rotated).await.unwrap();
        assert_eq!(validator.validate(&next.access_token).unwrap(), user_id);
    }

    #[tokio::test]
    async fn test_sweep_revokes_expired_only() {
        let (service, _, store) = setup(RotationPolicy::Reuse);
        let long_ago = Utc::now() - TimeDelta::days(90);

        let stale = service.issue_at(Uuid::new_v4(), long_ago).await.unwrap();
        let fresh = service.issue(Uuid::new_v4()).await.unwrap();

        assert_eq!(service.sweep_expired().await.unwrap(), 1);
        assert_eq!(service.sweep_expired().await.unwrap(), 0);

        let stale = store.find(&AuthUtils::sha256_hash(&stale)).await.unwrap().unwrap();
        assert_eq!(stale.state_at(Utc::now()), RefreshTokenState::Revoked);
        assert!(service.exchange(&fresh).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_exchanges_under_rotation_have_one_winner() {
        let (service, _, store) = setup(RotationPolicy::Rotate);
        let user_id = Uuid::new_v4();
        let token = service.issue(user_id).await.unwrap();
        let barrier = Arc::new(tokio::sync::Barrier::new(16));

        let racers: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                let token = token.clone();
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move {
                    barrier.wait().await;
                    service.exchange(&token).await
                })
            })
            .collect();

        let mut granted = Vec::new();
        for racer in racers {
            match racer.await.unwrap() {
                Ok(grant) => granted.push(grant),
                Err(e) => assert!(matches!(e, AuthError::RefreshTokenInvalid)),
            }
        }

        assert_eq!(granted.len(), 1);
        let replacement = granted[0].refresh_token.clone().unwrap();
        let record = store.find(&AuthUtils::sha256_hash(&replacement)).await.unwrap().unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.state_at(Utc::now()), RefreshTokenState::Active);
    }
}
