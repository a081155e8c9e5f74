//! Storage-layer errors and their mapping onto the account store
//! contract.

use devgate_core::error::DevgateError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Transport, authentication or engine failure from the driver.
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A statement executed but reported an error (e.g. an index or
    /// ASSERT rejected the write).
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored row could not be turned back into a domain value.
    #[error("Malformed account row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for DevgateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => DevgateError::NotFound { entity, id },
            DbError::Decode(message) => DevgateError::Internal(message),
            other => DevgateError::Database(other.to_string()),
        }
    }
}
