//! Server configuration from the process environment.
//!
//! A `.env` file in the working directory is loaded first (if any);
//! real environment variables take precedence over it.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use devgate_api::ApiConfig;
use devgate_auth::AuthConfig;
use devgate_db::DbConfig;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub db: DbConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("DEVGATE_BIND_ADDR")
            .unwrap_or_else(|| "0.0.0.0:8080".into())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "DEVGATE_BIND_ADDR",
                message: e.to_string(),
            })?;

        let jwt_secret =
            get("DEVGATE_JWT_SECRET").ok_or(ConfigError::Missing("DEVGATE_JWT_SECRET"))?;

        let require_email_verification = match get("DEVGATE_REQUIRE_EMAIL_VERIFICATION") {
            None => false,
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                key: "DEVGATE_REQUIRE_EMAIL_VERIFICATION",
                message: format!("expected true/false, got {raw:?}"),
            })?,
        };

        let auth = AuthConfig {
            require_email_verification,
            ..AuthConfig::new(jwt_secret)
        };

        let mut api = ApiConfig::new();
        if let Some(raw) = get("DEVGATE_REQUEST_TIMEOUT_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    key: "DEVGATE_REQUEST_TIMEOUT_SECS",
                    message: format!("expected a positive number of seconds, got {raw:?}"),
                })?;
            api = api.with_request_timeout(Duration::from_secs(secs));
        }
        if let Some(key) = get("DEVGATE_ADMIN_KEY") {
            api = api.with_admin_key(key);
        }

        let defaults = DbConfig::default();
        let db = DbConfig {
            url: get("DEVGATE_DB_URL").unwrap_or(defaults.url),
            namespace: get("DEVGATE_DB_NS").unwrap_or(defaults.namespace),
            database: get("DEVGATE_DB_NAME").unwrap_or(defaults.database),
            username: get("DEVGATE_DB_USER").unwrap_or(defaults.username),
            password: get("DEVGATE_DB_PASS").unwrap_or(defaults.password),
        };

        Ok(Self {
            bind_addr,
            api,
            auth,
            db,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
