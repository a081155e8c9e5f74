//! Developer account domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Plan tier assigned to newly registered accounts.
pub const DEFAULT_PLAN_TIER: &str = "free";

/// Account status. Governs whether authentication is permitted.
///
/// ```text
/// Pending ──verify──▶ Active ──suspend──▶ Suspended ──reactivate──▶ Active
///    │                  │                     │
///    └──────────────────┴──soft delete────────┴──▶ Deleted (terminal)
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountStatus {
    Pending,
    Active,
    Suspended,
    Deleted,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 4] = [
        AccountStatus::Pending,
        AccountStatus::Active,
        AccountStatus::Suspended,
        AccountStatus::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "Pending",
            AccountStatus::Active => "Active",
            AccountStatus::Suspended => "Suspended",
            AccountStatus::Deleted => "Deleted",
        }
    }

    /// Statuses from which a transition into `self` is allowed.
    ///
    /// Suspension and soft deletion match every live row so that
    /// repeating them is harmless; `Deleted` never leaves.
    pub fn allowed_sources(&self) -> &'static [AccountStatus] {
        match self {
            AccountStatus::Pending => &[],
            AccountStatus::Active => &[AccountStatus::Pending, AccountStatus::Suspended],
            AccountStatus::Suspended => &[
                AccountStatus::Pending,
                AccountStatus::Active,
                AccountStatus::Suspended,
            ],
            AccountStatus::Deleted => &[
                AccountStatus::Pending,
                AccountStatus::Active,
                AccountStatus::Suspended,
            ],
        }
    }

    pub fn can_transition_to(&self, next: AccountStatus) -> bool {
        next.allowed_sources().contains(self)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown account status: {s}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    /// Argon2id PHC string. Never serialized outward.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub status: AccountStatus,
    pub email_verified: bool,
    pub plan_tier: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Storage input for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub status: AccountStatus,
    pub plan_tier: String,
}

/// Profile fields that may be changed after registration.
///
/// Status is deliberately absent: it only moves through the explicit
/// lifecycle transitions.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub plan_tier: Option<String>,
}

impl UpdateProfile {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.company_name.is_none() && self.plan_tier.is_none()
    }
}

/// Filter for account listings.
///
/// Without a status, deleted accounts are excluded. Asking for
/// `Deleted` explicitly returns only soft-deleted accounts.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub status: Option<AccountStatus>,
    pub plan_tier: Option<String>,
}
