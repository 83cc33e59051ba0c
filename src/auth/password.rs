//! # 密码哈希与校验
//!
//! bcrypt-based password hashing. Verification always goes through
//! `bcrypt::verify`, never a string comparison.

use crate::error::{AuthError, Result};

/// bcrypt reads at most this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hashes and verifies account passwords.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    /// 使用指定工作因子创建哈希器
    #[must_use]
    pub const fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// 工作因子
    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Produce a salted bcrypt hash suitable for storage.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordTooLong {
                max: MAX_PASSWORD_BYTES,
            });
        }

        bcrypt::hash(plaintext, self.cost).map_err(AuthError::PasswordHash)
    }

    /// Check `plaintext` against `stored_hash`.
    ///
    /// Every failure, including an unreadable stored hash, is `PasswordMismatch`.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> Result<()> {
        if plaintext.len() > MAX_PASSWORD_BYTES {
            return Err(AuthError::PasswordMismatch);
        }

        match bcrypt::verify(plaintext, stored_hash) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthError::PasswordMismatch),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash could not be parsed");
                Err(AuthError::PasswordMismatch)
            }
        }
    }
}
