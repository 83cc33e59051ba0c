//! # 错误响应映射
//!
//! Maps `AuthError` onto HTTP status codes for the handler layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::{AuthError, ErrorCategory};

/// JSON body returned for every authentication failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// 错误详情
    pub error: ErrorDetails,
}

/// 错误详情
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    /// 稳定的错误代码
    pub code: String,
    /// 面向调用方的描述
    pub message: String,
}

impl AuthError {
    /// 将错误转换为HTTP状态码和错误代码
    ///
    /// Every token, password, API-key and refresh failure shares the
    /// `UNAUTHENTICATED` code.
    #[must_use]
    pub const fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::MissingCredential | Self::MalformedCredential => {
                (StatusCode::BAD_REQUEST, "MALFORMED_CREDENTIAL")
            }
            Self::PasswordTooLong { .. } => (StatusCode::BAD_REQUEST, "PASSWORD_TOO_LONG"),
            Self::InvalidToken(_)
            | Self::PasswordMismatch
            | Self::ApiKeyMismatch
            | Self::RefreshTokenInvalid => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            Self::SigningFailure(_)
            | Self::PasswordHash(_)
            | Self::Store { .. }
            | Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = self.to_http_response_parts();

        let message = match self.category() {
            ErrorCategory::Client => self.to_string(),
            ErrorCategory::Server => {
                tracing::error!(error = ?self, "authentication core fault");
                "internal server error".to_string()
            }
        };

        let body = ErrorBody {
            error: ErrorDetails {
                code: code.to_string(),
                message,
            },
        };

        (status, axum::Json(body)).into_response()
    }
}
