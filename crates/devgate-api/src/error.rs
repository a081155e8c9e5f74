//! API error type and its JSON rendering.
//!
//! Every error body has the shape `{"error": {"code", "message"}}`.
//! Codes are stable identifiers clients can branch on; messages are
//! for humans.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use devgate_auth::{AuthError, ErrorKind};
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400
    #[error("{message}")]
    BadRequest { code: &'static str, message: String },

    /// 401
    #[error("{message}")]
    Unauthorized { code: &'static str, message: String },

    /// 403
    #[error("{message}")]
    Forbidden { code: &'static str, message: String },

    /// 404
    #[error("{message}")]
    NotFound { message: String },

    /// 409
    #[error("{message}")]
    Conflict { code: &'static str, message: String },

    /// 500. The message is logged, never sent.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: "BAD_REQUEST",
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            code: "FORBIDDEN",
            message: message.into(),
        }
    }

    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            code,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest { code, .. }
            | ApiError::Unauthorized { code, .. }
            | ApiError::Forbidden { code, .. }
            | ApiError::Conflict { code, .. } => code,
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::InvalidEmail => ApiError::BadRequest {
                code: "INVALID_EMAIL",
                message,
            },
            AuthError::ShortPassword { .. } => ApiError::BadRequest {
                code: "SHORT_PASSWORD",
                message,
            },
            AuthError::WeakPassword => ApiError::BadRequest {
                code: "WEAK_PASSWORD",
                message,
            },
            AuthError::InvalidPassword => ApiError::BadRequest {
                code: "INVALID_PASSWORD",
                message,
            },
            AuthError::InvalidInput(_) => ApiError::BadRequest {
                code: "INVALID_INPUT",
                message,
            },
            AuthError::InvalidCredentials => ApiError::Unauthorized {
                code: "INVALID_CREDENTIALS",
                message,
            },
            AuthError::TokenExpired => ApiError::Unauthorized {
                code: "TOKEN_EXPIRED",
                message,
            },
            AuthError::TokenInvalid(_) => ApiError::Unauthorized {
                code: "INVALID_TOKEN",
                message: "invalid token".into(),
            },
            AuthError::AccountSuspended => ApiError::Forbidden {
                code: "ACCOUNT_SUSPENDED",
                message,
            },
            AuthError::AccountPendingVerification => ApiError::Forbidden {
                code: "ACCOUNT_PENDING_VERIFICATION",
                message,
            },
            AuthError::EmailExists => ApiError::Conflict {
                code: "EMAIL_EXISTS",
                message,
            },
            AuthError::WrongPassword => ApiError::Conflict {
                code: "PASSWORD_CHANGED",
                message,
            },
            AuthError::NotFound => ApiError::NotFound { message },
            other => match other.kind() {
                ErrorKind::NotFound => ApiError::NotFound { message },
                ErrorKind::Conflict => ApiError::Conflict {
                    code: "CONFLICT",
                    message,
                },
                ErrorKind::Validation => ApiError::bad_request(message),
                ErrorKind::Authorization => ApiError::forbidden(message),
                ErrorKind::Internal => ApiError::Internal { message },
            },
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Internal { message } => {
                tracing::error!(error = %message, "internal error");
                "internal server error"
            }
            ApiError::BadRequest { message, .. }
            | ApiError::Unauthorized { message, .. }
            | ApiError::Forbidden { message, .. }
            | ApiError::NotFound { message }
            | ApiError::Conflict { message, .. } => message.as_str(),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message,
            },
        };
        (status, Json(body)).into_response()
    }
}
