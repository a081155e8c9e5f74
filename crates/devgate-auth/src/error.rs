//! Authentication and account lifecycle error types.

use devgate_core::error::{Constraint, DevgateError};
use thiserror::Error;

/// Coarse classification used by callers to pick a remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; fix the request.
    Validation,
    /// The addressed account does not exist.
    NotFound,
    /// Duplicate email or a concurrent password change; retry or report.
    Conflict,
    /// Credentials, token or account state refuse the call.
    Authorization,
    /// Storage or crypto failure.
    Internal,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email format")]
    InvalidEmail,

    #[error("password should be at least {min} characters long")]
    ShortPassword { min: usize },

    #[error("password should include a letter and a number or symbol")]
    WeakPassword,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("email already registered")]
    EmailExists,

    /// Unknown email and wrong password both end up here.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is suspended")]
    AccountSuspended,

    #[error("account is pending verification")]
    AccountPendingVerification,

    /// The old password supplied to a password change did not verify.
    #[error("invalid password")]
    InvalidPassword,

    /// The stored hash changed between read and conditional write.
    #[error("password was changed concurrently")]
    WrongPassword,

    #[error("account not found")]
    NotFound,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    #[error(transparent)]
    Store(DevgateError),
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidEmail
            | AuthError::ShortPassword { .. }
            | AuthError::WeakPassword
            | AuthError::InvalidInput(_) => ErrorKind::Validation,
            AuthError::NotFound => ErrorKind::NotFound,
            AuthError::EmailExists | AuthError::WrongPassword => ErrorKind::Conflict,
            AuthError::InvalidCredentials
            | AuthError::AccountSuspended
            | AuthError::AccountPendingVerification
            | AuthError::InvalidPassword
            | AuthError::TokenExpired
            | AuthError::TokenInvalid(_) => ErrorKind::Authorization,
            AuthError::Crypto(_) => ErrorKind::Internal,
            AuthError::Store(err) => match err {
                DevgateError::NotFound { .. } => ErrorKind::NotFound,
                DevgateError::AlreadyExists { .. } | DevgateError::StaleWrite { .. } => {
                    ErrorKind::Conflict
                }
                DevgateError::Validation { .. } => ErrorKind::Validation,
                DevgateError::Database(_) | DevgateError::Timeout | DevgateError::Internal(_) => {
                    ErrorKind::Internal
                }
            },
        }
    }
}

impl From<DevgateError> for AuthError {
    fn from(err: DevgateError) -> Self {
        match err {
            DevgateError::NotFound { .. } => AuthError::NotFound,
            DevgateError::AlreadyExists {
                constraint: Constraint::UniqueEmail,
                ..
            } => AuthError::EmailExists,
            DevgateError::StaleWrite { .. } => AuthError::WrongPassword,
            DevgateError::Validation { message } => AuthError::InvalidInput(message),
            other => AuthError::Store(other),
        }
    }
}
