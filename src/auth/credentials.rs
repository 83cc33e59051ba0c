//! # 凭据提取
//!
//! Pulls bearer tokens and webhook API keys out of request headers, and checks
//! the webhook key against the configured value in constant time.

use std::collections::HashMap;

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::config::SigningSecret;
use crate::error::{AuthError, Result};

/// Header carrying both credential schemes.
pub const AUTHORIZATION: &str = "authorization";
/// Scheme prefix for access and refresh tokens.
pub const BEARER_PREFIX: &str = "Bearer ";
/// Scheme prefix for the payment webhook key.
pub const API_KEY_PREFIX: &str = "ApiKey ";

/// Case-insensitive header name to one-or-more values mapping.
///
/// Names are stored lowercased; values keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: HashMap<String, Vec<String>>,
}

impl Headers {
    /// 创建空的请求头集合
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, keeping any existing ones.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.into());
    }

    /// Replace every value of `name` with `value`.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.entries
            .insert(name.to_ascii_lowercase(), vec![value.into()]);
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).first().map(String::as_str)
    }

    /// All values of `name`, empty when absent.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map_or(&[][..], Vec::as_slice)
    }

    /// 是否为空
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: AsRef<str>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name.as_ref(), value);
        }
        headers
    }
}

impl From<&HeaderMap> for Headers {
    /// Values that are not visible ASCII are skipped.
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect()
    }
}

/// `从Authorization头中提取Bearer` token
///
/// The remainder after `"Bearer "` is returned verbatim.
pub fn bearer_token(headers: &Headers) -> Result<String> {
    scheme_credential(headers, BEARER_PREFIX)
}

/// 从Authorization头中提取 webhook API Key (`ApiKey <key>`)
pub fn api_key(headers: &Headers) -> Result<String> {
    scheme_credential(headers, API_KEY_PREFIX)
}

fn scheme_credential(headers: &Headers, prefix: &str) -> Result<String> {
    let value = headers
        .get(AUTHORIZATION)
        .filter(|value| !value.is_empty())
        .ok_or(AuthError::MissingCredential)?;

    match value.strip_prefix(prefix) {
        Some(credential) if !credential.is_empty() => Ok(credential.to_string()),
        _ => Err(AuthError::MalformedCredential),
    }
}

/// Checks the payment webhook's shared key.
///
/// Both sides are reduced to SHA-256 digests first so the comparison runs over
/// equal-length inputs regardless of what the caller sent.
#[derive(Clone)]
pub struct ApiKeyVerifier {
    expected: [u8; 32],
}

impl ApiKeyVerifier {
    /// Create a verifier for the configured key.
    #[must_use]
    pub fn new(key: &SigningSecret) -> Self {
        Self {
            expected: Sha256::digest(key.as_bytes()).into(),
        }
    }

    /// Whether `candidate` equals the configured key.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let provided: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        provided.as_slice().ct_eq(self.expected.as_slice()).into()
    }

    /// Extract the `ApiKey` credential from `headers` and check it.
    pub fn verify(&self, headers: &Headers) -> Result<()> {
        let key = api_key(headers)?;

        if self.matches(&key) {
            Ok(())
        } else {
            tracing::warn!("webhook request presented an unknown API key");
            Err(AuthError::ApiKeyMismatch)
        }
    }
}
