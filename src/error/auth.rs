//! Errors raised while authenticating a request.

use std::fmt;

use thiserror::Error;

use super::ErrorCategory;

/// The primary error type for all authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 未提供认证凭据
    #[error("authentication credential was not provided")]
    MissingCredential,

    /// 认证头格式错误
    #[error("authentication header is malformed")]
    MalformedCredential,

    /// 访问令牌校验失败，具体原因仅用于日志
    #[error(transparent)]
    InvalidToken(#[from] InvalidToken),

    /// 密码不匹配
    #[error("invalid credentials")]
    PasswordMismatch,

    /// 密码超过 bcrypt 输入上限
    #[error("password exceeds {max} bytes")]
    PasswordTooLong {
        /// 允许的最大字节数
        max: usize,
    },

    /// Webhook API Key 不匹配
    #[error("invalid API key")]
    ApiKeyMismatch,

    /// 刷新令牌未知、已过期或已撤销
    #[error("invalid refresh token")]
    RefreshTokenInvalid,

    /// 访问令牌签名失败
    #[error("failed to sign access token")]
    SigningFailure(#[source] jsonwebtoken::errors::Error),

    /// 密码哈希失败
    #[error("failed to hash password")]
    PasswordHash(#[source] bcrypt::BcryptError),

    /// 刷新令牌存储错误
    #[error("refresh token store error: {message}")]
    Store {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 配置相关错误
    #[error("configuration error: {message}")]
    Config {
        /// 错误描述
        message: String,
        /// 底层错误
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl AuthError {
    /// 创建存储错误
    pub fn store<T: Into<String>>(message: T) -> Self {
        Self::Store {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的存储错误
    pub fn store_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Store {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Whether the caller or the server is at fault.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::SigningFailure(_)
            | Self::PasswordHash(_)
            | Self::Store { .. }
            | Self::Config { .. } => ErrorCategory::Server,
            _ => ErrorCategory::Client,
        }
    }
}

/// Why an access token was rejected.
///
/// Only for logs and diagnostics: callers must answer every kind the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRejection {
    /// Not a decodable compact JWS with the expected claims.
    Malformed,
    /// HMAC did not match the signing secret.
    InvalidSignature,
    /// `exp` is at or before the validation instant.
    Expired,
    /// `iss` is not the access-token issuer.
    IssuerMismatch,
    /// `sub` is not a UUID.
    SubjectUnparseable,
}

impl TokenRejection {
    /// Stable label used in log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::IssuerMismatch => "issuer_mismatch",
            Self::SubjectUnparseable => "subject_unparseable",
        }
    }
}

impl fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single failure a token validation can produce.
///
/// `Display` is identical for every rejection kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidToken {
    reason: TokenRejection,
}

impl InvalidToken {
    pub(crate) const fn new(reason: TokenRejection) -> Self {
        Self { reason }
    }

    /// The internal rejection kind. Never expose this in a response.
    #[must_use]
    pub const fn reason(&self) -> TokenRejection {
        self.reason
    }
}

impl fmt::Display for InvalidToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid token")
    }
}

impl std::error::Error for InvalidToken {}
