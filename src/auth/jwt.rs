//! JWT access token management
//!
//! Issues and validates the short-lived HS256 access tokens that gate every
//! protected endpoint. Both halves take the current instant explicitly in their
//! `_at` variants so issuance and expiry checks share one `chrono::Utc` clock.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::auth::types::{ACCESS_TOKEN_ISSUER, AccessClaims};
use crate::auth::utils::AuthUtils;
use crate::config::SigningSecret;
use crate::error::{AuthError, InvalidToken, Result, TokenRejection};

/// Mints signed access tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
}

impl TokenIssuer {
    /// Create an issuer keyed by `secret`.
    #[must_use]
    pub fn new(secret: &SigningSecret) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an access token for `user_id` valid for `lifetime` from now.
    ///
    /// Callers clamp `lifetime` before calling. Timestamps have one-second
    /// resolution: `exp` is rounded up, so any positive lifetime is honoured in
    /// full and a zero lifetime yields a token that is already expired.
    pub fn issue(&self, user_id: Uuid, lifetime: Duration) -> Result<String> {
        self.issue_at(user_id, lifetime, Utc::now())
    }

    /// Issue an access token as if the current instant were `now`.
    pub fn issue_at(&self, user_id: Uuid, lifetime: Duration, now: DateTime<Utc>) -> Result<String> {
        let issued_at = now.timestamp();
        let claims = AccessClaims::new(user_id, issued_at, expires_at(now, lifetime));

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "access token signing failed");
            AuthError::SigningFailure(e)
        })
    }
}

/// `exp` in whole seconds: the first second at or after `now + lifetime`.
fn expires_at(now: DateTime<Utc>, lifetime: Duration) -> i64 {
    if lifetime.is_zero() {
        return now.timestamp();
    }

    chrono::Duration::from_std(lifetime)
        .ok()
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .map_or(i64::MAX, |end| {
            end.timestamp()
                .saturating_add(i64::from(end.timestamp_subsec_nanos() > 0))
        })
}

/// Verifies access tokens and recovers the principal.
#[derive(Clone)]
pub struct TokenValidator {
    /// Decoding key
    decoding_key: DecodingKey,
    /// Validation configuration
    validation: Validation,
}

impl TokenValidator {
    /// Create a validator keyed by `secret`.
    #[must_use]
    pub fn new(secret: &SigningSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ACCESS_TOKEN_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        // exp is checked in validate_at against the caller's clock
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate `token` against the current time.
    pub fn validate(&self, token: &str) -> std::result::Result<Uuid, InvalidToken> {
        self.validate_at(token, Utc::now())
    }

    /// Validate `token` as if the current instant were `now`.
    ///
    /// A token stops validating at the first second `>= exp`.
    pub fn validate_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Uuid, InvalidToken> {
        let claims = decode::<AccessClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| reject(token, map_jwt_error(&e)))?
            .claims;

        if claims.is_expired_at(now.timestamp()) {
            return Err(reject(token, TokenRejection::Expired));
        }

        claims
            .user_id()
            .map_err(|_| reject(token, TokenRejection::SubjectUnparseable))
    }
}

fn reject(token: &str, reason: TokenRejection) -> InvalidToken {
    tracing::debug!(
        reason = %reason,
        token = %AuthUtils::sanitize_token_for_logging(token),
        "access token rejected"
    );
    InvalidToken::new(reason)
}

/// Maps jsonwebtoken errors to a rejection kind.
fn map_jwt_error(error: &jsonwebtoken::errors::Error) -> TokenRejection {
    match error.kind() {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
            TokenRejection::InvalidSignature
        }
        ErrorKind::ExpiredSignature => TokenRejection::Expired,
        ErrorKind::InvalidIssuer => TokenRejection::IssuerMismatch,
        ErrorKind::InvalidSubject => TokenRejection::SubjectUnparseable,
        _ => TokenRejection::Malformed,
    }
}
