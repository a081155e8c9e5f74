//! HTTP layer configuration.

use std::fmt;
use std::time::Duration;

/// Header carrying the operator key on administrative routes.
pub const ADMIN_KEY_HEADER: &str = "x-devgate-admin-key";

/// Configuration for the HTTP surface.
#[derive(Clone)]
pub struct ApiConfig {
    /// Whole-request deadline; elapsed requests answer 408.
    pub request_timeout: Duration,
    /// Operator key for status changes and purges. `None` disables
    /// those routes entirely.
    pub admin_key: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            admin_key: None,
        }
    }
}

impl ApiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_admin_key(mut self, key: impl Into<String>) -> Self {
        self.admin_key = Some(key.into()).filter(|key| !key.is_empty());
        self
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("request_timeout", &self.request_timeout)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
