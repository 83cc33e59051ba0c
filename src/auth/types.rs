//! # 认证类型定义
//!
//! 定义认证相关的数据结构和常量

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer tag carried by every access token.
///
/// Tokens minted for any other purpose with the same secret must use a
/// different value so they can never pass as access tokens.
pub const ACCESS_TOKEN_ISSUER: &str = "chirpy-access";

/// JWT 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// 签发者
    pub iss: String,
    /// 用户ID
    pub sub: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
}

impl AccessClaims {
    /// 创建新的访问令牌载荷
    #[must_use]
    pub fn new(user_id: Uuid, issued_at: i64, expires_at: i64) -> Self {
        Self {
            iss: ACCESS_TOKEN_ISSUER.to_string(),
            sub: user_id.to_string(),
            iat: issued_at,
            exp: expires_at,
        }
    }

    /// 检查令牌在给定时刻是否已过期
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    /// 获取用户ID
    pub fn user_id(&self) -> Result<Uuid, uuid::Error> {
        Uuid::parse_str(&self.sub)
    }
}

/// Token pair structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token
    pub access_token: String,
    /// Refresh token
    pub refresh_token: String,
    /// Token type
    pub token_type: String,
    /// Expires in seconds
    pub expires_in: u64,
}

/// Result of a refresh-token exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshGrant {
    /// Freshly issued access token
    pub access_token: String,
    /// Replacement refresh token, present only when rotation is enabled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expires in seconds
    pub expires_in: u64,
}
