//! Error types shared across devgate crates.

use std::fmt;

use thiserror::Error;

/// Named storage constraints that can reject a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Email is unique among accounts that are not soft-deleted.
    UniqueEmail,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::UniqueEmail => f.write_str("unique_email"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DevgateError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} (constraint: {constraint})")]
    AlreadyExists {
        entity: String,
        constraint: Constraint,
    },

    /// A conditional write found the record changed since it was read.
    #[error("Stale write: {entity} with id {id} changed underneath")]
    StaleWrite { entity: String, id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage call timed out")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type DevgateResult<T> = Result<T, DevgateError>;
