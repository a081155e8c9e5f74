//! Credential policy: email syntax, password strength and Argon2id
//! password hashing.

use std::sync::LazyLock;

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use regex::Regex;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// Longest address accepted, per RFC 5321 path limits.
const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_PART_LEN: usize = 64;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Syntactic mailbox check (`local@domain`). No DNS or MX lookups.
///
/// Display-name forms such as `Jane <jane@example.com>` are rejected:
/// the stored address must be the bare mailbox.
pub fn validate_email(candidate: &str) -> bool {
    if candidate.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(candidate) {
        return false;
    }
    let Some((local, _)) = candidate.rsplit_once('@') else {
        return false;
    };
    local.len() <= MAX_LOCAL_PART_LEN
        && !local.starts_with('.')
        && !local.ends_with('.')
        && !local.contains("..")
}

/// Enforce the password policy.
///
/// Shorter than `min_len` characters fails with `ShortPassword`.
/// Otherwise the password needs at least one ASCII letter and at least
/// one character that is not an ASCII letter (digits and symbols count
/// as a single class), or it fails with `WeakPassword`.
pub fn validate_password_strength(candidate: &str, min_len: usize) -> Result<(), AuthError> {
    if candidate.chars().count() < min_len {
        return Err(AuthError::ShortPassword { min: min_len });
    }

    let has_letter = candidate.chars().any(|c| c.is_ascii_alphabetic());
    let has_other = candidate.chars().any(|c| !c.is_ascii_alphabetic());

    if has_letter && has_other {
        Ok(())
    } else {
        Err(AuthError::WeakPassword)
    }
}

fn hasher(config: &AuthConfig) -> Result<Argon2<'static>, AuthError> {
    let params = argon2::Params::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a password with Argon2id into a PHC string.
///
/// A fresh random salt is generated on every call, so hashing the same
/// password twice never yields the same string.
pub fn hash_password(password: &str, config: &AuthConfig) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(config)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// Cost parameters are read from the hash itself. A malformed hash
/// yields `false` rather than an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match argon2::PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => true,
        Err(argon2::password_hash::Error::Password) => false,
        Err(e) => {
            tracing::warn!(error = %e, "password verification failed");
            false
        }
    }
}
