//! Authentication configuration.

use std::fmt;
use std::time::Duration;

/// Configuration for credential handling and session tokens.
///
/// Constructed once at startup and passed to [`TokenService`] and
/// [`AccountService`] by value.
///
/// [`TokenService`]: crate::token::TokenService
/// [`AccountService`]: crate::service::AccountService
#[derive(Clone)]
pub struct AuthConfig {
    /// Shared HS256 signing secret for access and refresh tokens.
    pub jwt_secret: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 604_800 = 7 days).
    pub refresh_token_lifetime_secs: u64,
    /// Clock skew tolerance applied to `exp` during validation.
    pub leeway_secs: u64,
    /// Minimum password length for policy enforcement.
    pub min_password_length: usize,
    /// Argon2id memory cost in KiB.
    pub argon2_memory_kib: u32,
    /// Argon2id iteration count.
    pub argon2_iterations: u32,
    /// Argon2id lanes.
    pub argon2_parallelism: u32,
    /// When set, new accounts start `Pending` and cannot log in until
    /// their email is verified.
    pub require_email_verification: bool,
    /// Upper bound on every storage call made by the lifecycle service.
    pub store_timeout_secs: u64,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            ..Default::default()
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "devgate".into(),
            access_token_lifetime_secs: 900,
            refresh_token_lifetime_secs: 604_800,
            leeway_secs: 0,
            min_password_length: 8,
            // OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1
            argon2_memory_kib: 19_456,
            argon2_iterations: 2,
            argon2_parallelism: 1,
            require_email_verification: false,
            store_timeout_secs: 5,
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("refresh_token_lifetime_secs", &self.refresh_token_lifetime_secs)
            .field("leeway_secs", &self.leeway_secs)
            .field("min_password_length", &self.min_password_length)
            .field("argon2_memory_kib", &self.argon2_memory_kib)
            .field("argon2_iterations", &self.argon2_iterations)
            .field("argon2_parallelism", &self.argon2_parallelism)
            .field("require_email_verification", &self.require_email_verification)
            .field("store_timeout_secs", &self.store_timeout_secs)
            .finish()
    }
}
