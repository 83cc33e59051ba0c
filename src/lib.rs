//! # Chirpy Auth
//!
//! 认证核心库: HS256 access tokens, opaque refresh tokens, bcrypt passwords
//! and the payment webhook key check.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use auth::{AuthService, Headers};
pub use config::AuthConfig;
pub use error::{AuthError, Result};
