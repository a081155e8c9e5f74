//! HS256 session tokens: issuance and validation of access/refresh
//! pairs signed with a single shared secret.
//!
//! Tokens are stateless. There is no server-side revocation list, so a
//! token stays valid until it expires and logout is a client-side
//! discard.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: account ID (UUID string).
    pub sub: String,
    pub email: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
    pub kind: TokenKind,
}

impl SessionClaims {
    /// Parsed account ID from the `sub` claim.
    pub fn account_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub)
            .map_err(|e| AuthError::TokenInvalid(format!("malformed subject: {e}")))
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Issues and validates session tokens.
///
/// Cheap to clone; keys are shared behind `Arc`s and only read.
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    access_lifetime_secs: i64,
    refresh_lifetime_secs: i64,
    encoding_key: Arc<EncodingKey>,
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl TokenService {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        if config.jwt_secret.is_empty() {
            return Err(AuthError::Crypto("JWT secret is not configured".into()));
        }
        if config.jwt_secret.len() < 32 {
            tracing::warn!("JWT secret is shorter than recommended (32 bytes)");
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&config.jwt_issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);
        validation.leeway = config.leeway_secs;
        validation.validate_aud = false;

        Ok(Self {
            issuer: config.jwt_issuer.clone(),
            access_lifetime_secs: lifetime(config.access_token_lifetime_secs),
            refresh_lifetime_secs: lifetime(config.refresh_token_lifetime_secs),
            encoding_key: Arc::new(EncodingKey::from_secret(config.jwt_secret.as_bytes())),
            decoding_key: Arc::new(DecodingKey::from_secret(config.jwt_secret.as_bytes())),
            validation: Arc::new(validation),
        })
    }

    /// Issue a signed access/refresh pair for an account.
    pub fn issue_pair(&self, account_id: Uuid, email: &str) -> Result<TokenPair, AuthError> {
        self.issue_pair_at(account_id, email, Utc::now().timestamp())
    }

    fn issue_pair_at(&self, account_id: Uuid, email: &str, now: i64) -> Result<TokenPair, AuthError> {
        let access_token = self.issue(account_id, email, TokenKind::Access, now)?;
        let refresh_token = self.issue(account_id, email, TokenKind::Refresh, now)?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_lifetime_secs as u64,
        })
    }

    fn issue(
        &self,
        account_id: Uuid,
        email: &str,
        kind: TokenKind,
        now: i64,
    ) -> Result<String, AuthError> {
        let lifetime = match kind {
            TokenKind::Access => self.access_lifetime_secs,
            TokenKind::Refresh => self.refresh_lifetime_secs,
        };
        let claims = SessionClaims {
            sub: account_id.to_string(),
            email: email.to_string(),
            iss: self.issuer.clone(),
            iat: now,
            exp: now.saturating_add(lifetime),
            jti: Uuid::new_v4().to_string(),
            kind,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))
    }

    /// Verify signature, then expiry, and return the claims.
    ///
    /// A correctly signed but expired token yields `TokenExpired`;
    /// anything tampered, malformed or foreign yields `TokenInvalid`.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        jsonwebtoken::decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::TokenInvalid(e.to_string()),
            })
    }

    /// Like [`validate`](Self::validate), additionally requiring the
    /// token to be of `expected` kind.
    pub fn validate_kind(
        &self,
        token: &str,
        expected: TokenKind,
    ) -> Result<SessionClaims, AuthError> {
        let claims = self.validate(token)?;
        if claims.kind != expected {
            return Err(AuthError::TokenInvalid(format!(
                "expected {expected:?} token, got {:?}",
                claims.kind
            )));
        }
        Ok(claims)
    }
}

fn lifetime(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}
