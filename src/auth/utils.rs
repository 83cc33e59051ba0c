//! # 认证工具函数
//!
//! 提供令牌脱敏和哈希等共享工具

use sha2::{Digest, Sha256};

/// 认证工具类
pub struct AuthUtils;

impl AuthUtils {
    /// `计算字符串的SHA256哈希值`
    ///
    /// Refresh tokens are stored under this digest rather than in the clear.
    ///
    /// # 返回
    /// 十六进制格式的哈希值
    #[must_use]
    pub fn sha256_hash(input: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Sanitize token for logging
    #[must_use]
    pub fn sanitize_token_for_logging(token: &str) -> String {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() > 20 {
            let head: String = chars[..8].iter().collect();
            let tail: String = chars[chars.len() - 8..].iter().collect();
            format!("{head}***{tail}")
        } else if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            format!("{head}***")
        } else {
            "***".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash() {
        let hash1 = AuthUtils::sha256_hash("test");
        let hash2 = AuthUtils::sha256_hash("test");
        let hash3 = AuthUtils::sha256_hash("different");

        // 相同输入应产生相同哈希
        assert_eq!(hash1, hash2);
        // 不同输入应产生不同哈希
        assert_ne!(hash1, hash3);
        assert_eq!(
            hash1,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sanitize_token_for_logging() {
        assert_eq!(
            AuthUtils::sanitize_token_for_logging("eyJhbGciOiJIUzI1NiJ9.payload.signature"),
            "eyJhbGci***ignature"
        );
        assert_eq!(AuthUtils::sanitize_token_for_logging("abcdefghij"), "abcd***");
        assert_eq!(AuthUtils::sanitize_token_for_logging("short"), "***");
        // 多字节字符不应导致切片越界
        assert_eq!(AuthUtils::sanitize_token_for_logging("ééééééééé"), "éééé***");
    }
}
