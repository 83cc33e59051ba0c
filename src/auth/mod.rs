//! # 认证授权模块
//!
//! 访问令牌、刷新令牌、密码和 webhook 密钥校验的统一入口。
//!
//! - [`credentials`]: pulls `Bearer` / `ApiKey` credentials out of headers
//! - [`password`]: bcrypt hashing and verification
//! - [`jwt`]: access token issuing and validation
//! - [`refresh`]: refresh token store contract and lifecycle
//! - [`service`]: the request-level flows built from the above

pub mod credentials;
pub mod jwt;
pub mod password;
pub mod refresh;
pub mod service;
pub mod types;
pub mod utils;

pub use credentials::{ApiKeyVerifier, Headers, api_key, bearer_token};
pub use jwt::{TokenIssuer, TokenValidator};
pub use password::PasswordHasher;
pub use refresh::{
    MemoryRefreshTokenStore, RefreshToken, RefreshTokenService, RefreshTokenState,
    RefreshTokenStore, RotationPolicy,
};
pub use service::AuthService;
pub use types::{AccessClaims, RefreshGrant, TokenPair};
