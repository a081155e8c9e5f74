//! SurrealDB implementation of [`AccountRepository`].
//!
//! Every conditional write is a single `UPDATE ... WHERE` statement,
//! so the condition and the write are applied atomically by the
//! database. When such a write matches nothing, a follow-up read only
//! classifies the failure (missing row vs. changed row).

use chrono::{DateTime, Utc};
use devgate_core::error::{Constraint, DevgateError, DevgateResult};
use devgate_core::models::account::{
    Account, AccountFilter, AccountStatus, CreateAccount, UpdateProfile,
};
use devgate_core::repository::{AccountRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

const ENTITY: &str = "account";

/// Tries for a password compare-and-swap aborted by a conflicting writer.
const CAS_ATTEMPTS: u32 = 3;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AccountRow {
    email: String,
    password_hash: String,
    full_name: Option<String>,
    company_name: Option<String>,
    status: String,
    email_verified: bool,
    plan_tier: String,
    metadata: serde_json::Value,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AccountRowWithId {
    record_id: String,
    email: String,
    password_hash: String,
    full_name: Option<String>,
    company_name: Option<String>,
    status: String,
    email_verified: bool,
    plan_tier: String,
    metadata: serde_json::Value,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct IdRow {
    record_id: String,
}

#[derive(Debug, SurrealValue)]
struct HashRow {
    password_hash: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_status(s: &str) -> Result<AccountStatus, DbError> {
    s.parse().map_err(DbError::Decode)
}

impl AccountRow {
    fn into_account(self, id: Uuid) -> Result<Account, DbError> {
        Ok(Account {
            id,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            company_name: self.company_name,
            status: parse_status(&self.status)?,
            email_verified: self.email_verified,
            plan_tier: self.plan_tier,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login_at: self.last_login_at,
        })
    }
}

impl AccountRowWithId {
    fn try_into_account(self) -> Result<Account, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(Account {
            id,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            company_name: self.company_name,
            status: parse_status(&self.status)?,
            email_verified: self.email_verified,
            plan_tier: self.plan_tier,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login_at: self.last_login_at,
        })
    }
}

fn not_found(id: impl Into<String>) -> DbError {
    DbError::NotFound {
        entity: ENTITY.into(),
        id: id.into(),
    }
}

/// Value stored in `email_key` once an account is soft-deleted.
fn tombstone(id: Uuid) -> String {
    format!("deleted:{id}")
}

/// SurrealDB implementation of the Account repository.
#[derive(Clone)]
pub struct SurrealAccountRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAccountRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Committed password hash of a live account, if there is one.
    async fn live_hash(&self, id: Uuid) -> Result<Option<String>, DbError> {
        let mut result = self
            .db
            .query(
                "SELECT password_hash FROM type::record('account', $id) \
                 WHERE status != 'Deleted'",
            )
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<HashRow> = result.take(0)?;
        Ok(rows.into_iter().next().map(|row| row.password_hash))
    }

    /// Whether a live account already holds the email's unique key.
    async fn email_taken(&self, email: &str) -> Result<bool, DbError> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id FROM account WHERE email_key = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await?;
        let rows: Vec<IdRow> = result.take(0)?;
        Ok(!rows.is_empty())
    }

    /// Run a single-record `UPDATE` and return the row it touched.
    async fn update_one(
        &self,
        id: Uuid,
        query: &str,
        binds: Vec<(&'static str, String)>,
    ) -> Result<Option<AccountRow>, DbError> {
        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder
            .await?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        let rows: Vec<AccountRow> = result.take(0)?;
        Ok(rows.into_iter().next())
    }
}

impl<C: Connection> AccountRepository for SurrealAccountRepository<C> {
    async fn insert(&self, input: CreateAccount) -> DevgateResult<Account> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let email = input.email.clone();

        let outcome = match self
            .db
            .query(
                "CREATE type::record('account', $id) SET \
                 email = $email, email_key = $email, \
                 password_hash = $password_hash, \
                 full_name = $full_name, company_name = $company_name, \
                 status = $status, email_verified = false, \
                 plan_tier = $plan_tier, metadata = {}",
            )
            .bind(("id", id_str.clone()))
            .bind(("email", input.email))
            .bind(("password_hash", input.password_hash))
            .bind(("full_name", input.full_name))
            .bind(("company_name", input.company_name))
            .bind(("status", input.status.as_str().to_string()))
            .bind(("plan_tier", input.plan_tier))
            .await
        {
            Ok(response) => response.check().map_err(|e| DbError::Query(e.to_string())),
            Err(e) => Err(DbError::from(e)),
        };

        let mut result = match outcome {
            Ok(result) => result,
            Err(err) => {
                // The unique index rejected the write; confirm it was the
                // email and report the constraint by name.
                if self.email_taken(&email).await? {
                    debug!(email = %email, "email already registered");
                    return Err(DevgateError::AlreadyExists {
                        entity: ENTITY.into(),
                        constraint: Constraint::UniqueEmail,
                    });
                }
                return Err(err.into());
            }
        };

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_account(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> DevgateResult<Account> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('account', $id) \
                 WHERE status != 'Deleted'",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| not_found(id_str))?;

        Ok(row.into_account(id)?)
    }

    async fn get_by_email(&self, email: &str) -> DevgateResult<Account> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE email = $email AND status != 'Deleted'",
            )
            .bind(("email", email.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| not_found(format!("email={email}")))?;

        Ok(row.try_into_account()?)
    }

    async fn list(
        &self,
        filter: AccountFilter,
        pagination: Pagination,
    ) -> DevgateResult<PaginatedResult<Account>> {
        let mut clauses = vec![match filter.status {
            None => "status != 'Deleted'",
            Some(_) => "status = $status",
        }];
        let plan_tier = filter.plan_tier.filter(|tier| !tier.is_empty());
        if plan_tier.is_some() {
            clauses.push("plan_tier = $plan_tier");
        }
        let where_clause = clauses.join(" AND ");
        let status = filter
            .status
            .map(|s| s.as_str().to_string())
            .unwrap_or_default();
        let plan_tier = plan_tier.unwrap_or_default();

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM account WHERE {where_clause} GROUP ALL"
            ))
            .bind(("status", status.clone()))
            .bind(("plan_tier", plan_tier.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(format!(
                "SELECT meta::id(id) AS record_id, * FROM account \
                 WHERE {where_clause} \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset"
            ))
            .bind(("status", status))
            .bind(("plan_tier", plan_tier))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AccountRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_account())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn cas_update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> DevgateResult<()> {
        let mut attempt = 1;
        loop {
            let outcome = self
                .update_one(
                    id,
                    "UPDATE type::record('account', $id) SET \
                     password_hash = $new_hash, updated_at = time::now() \
                     WHERE password_hash = $expected_hash AND status != 'Deleted'",
                    vec![
                        ("new_hash", new_hash.to_string()),
                        ("expected_hash", expected_hash.to_string()),
                    ],
                )
                .await;

            let failure = match outcome {
                Ok(Some(_)) => return Ok(()),
                Ok(None) => None,
                // A concurrent writer can abort this transaction before the
                // WHERE clause is ever evaluated; the committed row decides.
                Err(err) => Some(err),
            };

            match self.live_hash(id).await? {
                None => return Err(not_found(id.to_string()).into()),
                Some(current) if current != expected_hash => {
                    debug!(account_id = %id, attempt, "password compare-and-swap lost");
                    return Err(DevgateError::StaleWrite {
                        entity: ENTITY.into(),
                        id: id.to_string(),
                    });
                }
                Some(_) => match failure {
                    Some(err) if attempt >= CAS_ATTEMPTS => return Err(err.into()),
                    Some(err) => {
                        debug!(account_id = %id, attempt, error = %err, "retrying password compare-and-swap");
                    }
                    // Matched nothing yet the hash is unchanged: the row was
                    // restored between the two reads. Treat as a conflict.
                    None if attempt >= CAS_ATTEMPTS => {
                        return Err(DevgateError::StaleWrite {
                            entity: ENTITY.into(),
                            id: id.to_string(),
                        });
                    }
                    None => {}
                },
            }
            attempt += 1;
        }
    }

    async fn set_password(&self, id: Uuid, new_hash: &str) -> DevgateResult<()> {
        self.update_one(
            id,
            "UPDATE type::record('account', $id) SET \
             password_hash = $new_hash, updated_at = time::now() \
             WHERE status != 'Deleted'",
            vec![("new_hash", new_hash.to_string())],
        )
        .await?
        .ok_or_else(|| not_found(id.to_string()))?;
        Ok(())
    }

    async fn update_profile(&self, id: Uuid, input: UpdateProfile) -> DevgateResult<Account> {
        let mut sets = Vec::new();
        let mut binds = Vec::new();
        if let Some(full_name) = input.full_name {
            sets.push("full_name = $full_name");
            binds.push(("full_name", full_name));
        }
        if let Some(company_name) = input.company_name {
            sets.push("company_name = $company_name");
            binds.push(("company_name", company_name));
        }
        if let Some(plan_tier) = input.plan_tier {
            sets.push("plan_tier = $plan_tier");
            binds.push(("plan_tier", plan_tier));
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "UPDATE type::record('account', $id) SET {} \
             WHERE status != 'Deleted'",
            sets.join(", ")
        );

        let row = self
            .update_one(id, &query, binds)
            .await?
            .ok_or_else(|| not_found(id.to_string()))?;
        Ok(row.into_account(id)?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        from: &[AccountStatus],
    ) -> DevgateResult<()> {
        let mut sets = vec!["status = $status", "updated_at = time::now()"];
        if status == AccountStatus::Deleted {
            sets.push("email_key = $tombstone");
        }
        let query = format!(
            "UPDATE type::record('account', $id) SET {} WHERE status IN $from",
            sets.join(", ")
        );
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();

        let mut result = self
            .db
            .query(query)
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str().to_string()))
            .bind(("tombstone", tombstone(id)))
            .bind(("from", from))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(id.to_string()).into());
        }
        Ok(())
    }

    async fn verify_email(&self, id: Uuid) -> DevgateResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 email_verified = true, updated_at = time::now() \
                 WHERE status != 'Deleted'; \
                 UPDATE type::record('account', $id) SET \
                 status = 'Active' WHERE status = 'Pending';",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(id.to_string()).into());
        }
        Ok(())
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DevgateResult<()> {
        let mut result = self
            .db
            .query(
                "UPDATE type::record('account', $id) SET \
                 last_login_at = $at, updated_at = time::now() \
                 WHERE status != 'Deleted'",
            )
            .bind(("id", id.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(id.to_string()).into());
        }
        Ok(())
    }

    async fn merge_metadata(
        &self,
        id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> DevgateResult<()> {
        let mut patch = serde_json::Map::new();
        patch.insert(key.to_string(), value);

        let mut result = self
            .db
            .query(
                "UPDATE type::record('account', $id) \
                 MERGE { metadata: $patch, updated_at: time::now() } \
                 WHERE status != 'Deleted'",
            )
            .bind(("id", id.to_string()))
            .bind(("patch", serde_json::Value::Object(patch)))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(id.to_string()).into());
        }
        Ok(())
    }

    async fn hard_delete(&self, id: Uuid) -> DevgateResult<()> {
        let mut result = self
            .db
            .query("DELETE type::record('account', $id) RETURN BEFORE")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<AccountRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(not_found(id.to_string()).into());
        }
        Ok(())
    }

    async fn ping(&self) -> DevgateResult<()> {
        self.db
            .query("RETURN true")
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
