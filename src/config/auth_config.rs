//! # 认证配置结构定义

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::auth::refresh::RotationPolicy;

/// Upper bound for access-token lifetimes, in seconds.
pub const MAX_ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// HMAC key shared by the token issuer and validator.
///
/// Loaded once at startup and never printed: `Debug` and `Serialize` both redact it.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Raw key bytes for the HMAC primitive.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// 密钥是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret(***)")
    }
}

impl From<&str> for SigningSecret {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl From<String> for SigningSecret {
    fn from(value: String) -> Self {
        Self::new(value.into_bytes())
    }
}

impl Serialize for SigningSecret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl<'de> Deserialize<'de> for SigningSecret {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// 认证配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// JWT 签名密钥
    pub jwt_secret: SigningSecret,
    /// Shared key the payment webhook presents as `ApiKey <key>`
    pub polka_key: SigningSecret,
    /// 访问令牌有效期（秒）
    #[serde(default = "default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
    /// 刷新令牌有效期（天）
    #[serde(default = "default_refresh_token_ttl_days")]
    pub refresh_token_ttl_days: u64,
    /// bcrypt 工作因子
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// 刷新令牌轮换策略
    #[serde(default)]
    pub rotation: RotationPolicy,
}

const fn default_access_token_ttl_secs() -> u64 {
    MAX_ACCESS_TOKEN_TTL_SECS
}

const fn default_refresh_token_ttl_days() -> u64 {
    60
}

const fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

impl AuthConfig {
    /// Build a config with defaults for everything but the two secrets.
    pub fn new(jwt_secret: impl Into<SigningSecret>, polka_key: impl Into<SigningSecret>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            polka_key: polka_key.into(),
            access_token_ttl_secs: default_access_token_ttl_secs(),
            refresh_token_ttl_days: default_refresh_token_ttl_days(),
            bcrypt_cost: default_bcrypt_cost(),
            rotation: RotationPolicy::default(),
        }
    }

    /// Default access-token lifetime.
    #[must_use]
    pub const fn access_token_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.access_token_ttl_secs)
    }

    /// Refresh-token lifetime.
    #[must_use]
    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        i64::try_from(self.refresh_token_ttl_days)
            .ok()
            .and_then(chrono::Duration::try_days)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.is_empty() {
            return Err("jwt_secret cannot be empty".to_string());
        }
        if self.polka_key.is_empty() {
            return Err("polka_key cannot be empty".to_string());
        }
        if self.access_token_ttl_secs == 0 || self.access_token_ttl_secs > MAX_ACCESS_TOKEN_TTL_SECS {
            return Err(format!(
                "access_token_ttl_secs must be between 1 and {MAX_ACCESS_TOKEN_TTL_SECS}"
            ));
        }
        if self.refresh_token_ttl_days == 0 {
            return Err("refresh_token_ttl_days must be greater than 0".to_string());
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(format!("bcrypt_cost must be between 4 and 31, got {}", self.bcrypt_cost));
        }
        Ok(())
    }
}
