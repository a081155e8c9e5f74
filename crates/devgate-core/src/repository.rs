//! Storage contract consumed by the account lifecycle service.
//!
//! All operations are async and bounded by the caller: dropping the
//! returned future abandons the call. Lookups exclude soft-deleted
//! rows unless a filter explicitly asks for them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::DevgateResult;
use crate::models::account::{Account, AccountFilter, AccountStatus, CreateAccount, UpdateProfile};

/// Largest offset handed to storage; `START` takes a 32-bit count.
pub const MAX_OFFSET: u64 = u32::MAX as u64;

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// Build from a 1-based page number, clamping nonsense to defaults.
    ///
    /// Page numbers past the addressable range saturate and yield an
    /// empty page.
    pub fn from_page(page: u64, page_size: u64) -> Self {
        let page = page.max(1);
        let limit = if page_size == 0 { 20 } else { page_size.min(100) };
        Self {
            offset: (page - 1).saturating_mul(limit).min(MAX_OFFSET),
            limit,
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

pub trait AccountRepository: Send + Sync {
    /// Fails with `AlreadyExists { constraint: UniqueEmail }` when a
    /// live account already uses the email.
    fn insert(&self, input: CreateAccount) -> impl Future<Output = DevgateResult<Account>> + Send;

    fn get_by_id(&self, id: Uuid) -> impl Future<Output = DevgateResult<Account>> + Send;

    fn get_by_email(&self, email: &str) -> impl Future<Output = DevgateResult<Account>> + Send;

    fn list(
        &self,
        filter: AccountFilter,
        pagination: Pagination,
    ) -> impl Future<Output = DevgateResult<PaginatedResult<Account>>> + Send;

    /// Replace the password hash only if it still equals `expected_hash`.
    ///
    /// Fails with `NotFound` when no live account has the id and with
    /// `StaleWrite` when the stored hash no longer matches.
    fn cas_update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> impl Future<Output = DevgateResult<()>> + Send;

    /// Unconditional password overwrite.
    fn set_password(&self, id: Uuid, new_hash: &str)
    -> impl Future<Output = DevgateResult<()>> + Send;

    fn update_profile(
        &self,
        id: Uuid,
        input: UpdateProfile,
    ) -> impl Future<Output = DevgateResult<Account>> + Send;

    /// Move the account to `status` if its current status is one of
    /// `from`. Fails with `NotFound` when no row matches.
    fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        from: &[AccountStatus],
    ) -> impl Future<Output = DevgateResult<()>> + Send;

    /// Mark the email verified and promote a pending account to active.
    fn verify_email(&self, id: Uuid) -> impl Future<Output = DevgateResult<()>> + Send;

    fn update_last_login(
        &self,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = DevgateResult<()>> + Send;

    /// Additive merge of one key into the metadata object.
    fn merge_metadata(
        &self,
        id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> impl Future<Output = DevgateResult<()>> + Send;

    /// Remove the row entirely, whatever its status.
    fn hard_delete(&self, id: Uuid) -> impl Future<Output = DevgateResult<()>> + Send;

    /// Cheap round trip proving storage is reachable.
    fn ping(&self) -> impl Future<Output = DevgateResult<()>> + Send;
}
