//! Account lifecycle service: registration, authentication, session
//! renewal, credential rotation and status transitions.

use std::sync::OnceLock;

use chrono::Utc;
use devgate_core::error::{DevgateError, DevgateResult};
use devgate_core::models::account::{
    Account, AccountFilter, AccountStatus, CreateAccount, DEFAULT_PLAN_TIER, UpdateProfile,
};
use devgate_core::repository::{AccountRepository, PaginatedResult, Pagination};
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::token::{TokenKind, TokenPair, TokenService};

/// Input for the registration flow.
///
/// The password is wiped from memory when the input is dropped.
#[derive(Debug)]
pub struct RegisterInput {
    pub email: String,
    pub password: Zeroizing<String>,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
}

/// Successful authentication result.
#[derive(Debug)]
pub struct AuthenticatedSession {
    pub account: Account,
    pub tokens: TokenPair,
}

/// Account lifecycle service.
///
/// Generic over the repository implementation so that the auth layer
/// has no dependency on the database crate. Holds no locks: the only
/// cross-request coordination, the password compare-and-swap, happens
/// in storage.
pub struct AccountService<R: AccountRepository> {
    repo: R,
    tokens: TokenService,
    config: AuthConfig,
    /// Hash checked when a login names no account.
    dummy_hash: OnceLock<String>,
}

const DUMMY_PASSWORD: &str = "devgate-unknown-account";

impl<R: AccountRepository> AccountService<R> {
    pub fn new(repo: R, tokens: TokenService, config: AuthConfig) -> Self {
        Self {
            repo,
            tokens,
            config,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Run one storage call under the configured timeout.
    async fn bounded<T>(
        &self,
        call: impl Future<Output = DevgateResult<T>>,
    ) -> Result<T, AuthError> {
        match tokio::time::timeout(self.config.store_timeout(), call).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Store(DevgateError::Timeout)),
        }
    }

    /// Spend one password verification on a throwaway hash, so an
    /// unknown email costs as much as a wrong password.
    fn verify_dummy(&self, password: &str) {
        let hash = match self.dummy_hash.get() {
            Some(hash) => hash,
            None => match password::hash_password(DUMMY_PASSWORD, &self.config) {
                Ok(hash) => self.dummy_hash.get_or_init(|| hash),
                Err(e) => {
                    warn!(error = %e, "failed to build dummy hash");
                    return;
                }
            },
        };
        let _ = password::verify_password(password, hash);
    }

    /// Register a new account.
    ///
    /// Policy violations fail before storage is touched. The password
    /// is hashed first and the plaintext dropped before the insert.
    pub async fn register(&self, input: RegisterInput) -> Result<Account, AuthError> {
        let RegisterInput {
            email,
            password,
            full_name,
            company_name,
        } = input;
        debug!(email = %email, "registering account");

        if !password::validate_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        password::validate_password_strength(&password, self.config.min_password_length)?;

        let password_hash = password::hash_password(&password, &self.config)?;
        drop(password);

        let status = if self.config.require_email_verification {
            AccountStatus::Pending
        } else {
            AccountStatus::Active
        };

        let account = self
            .bounded(self.repo.insert(CreateAccount {
                email,
                password_hash,
                full_name,
                company_name,
                status,
                plan_tier: DEFAULT_PLAN_TIER.into(),
            }))
            .await?;

        info!(account_id = %account.id, status = %account.status, "account registered");
        Ok(account)
    }

    /// Authenticate with email + password and issue a token pair.
    ///
    /// Unknown email and wrong password are indistinguishable. Account
    /// state is only revealed once the password has verified.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedSession, AuthError> {
        let account = match self.bounded(self.repo.get_by_email(email)).await {
            Ok(account) => account,
            Err(AuthError::NotFound) => {
                debug!("login for unknown email");
                self.verify_dummy(password);
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !password::verify_password(password, &account.password_hash) {
            debug!(account_id = %account.id, "invalid password attempt");
            return Err(AuthError::InvalidCredentials);
        }

        self.ensure_eligible(&account)?;

        let tokens = self.tokens.issue_pair(account.id, &account.email)?;

        // Best effort: a failed timestamp must not fail the login.
        if let Err(e) = self
            .bounded(self.repo.update_last_login(account.id, Utc::now()))
            .await
        {
            warn!(account_id = %account.id, error = %e, "failed to record last login");
        }

        info!(account_id = %account.id, "account logged in");
        Ok(AuthenticatedSession { account, tokens })
    }

    /// Exchange a refresh token for a fresh pair.
    ///
    /// Tokens do not self-invalidate when an account is suspended, so
    /// current status is re-read from storage on every refresh. The old
    /// refresh token stays valid until it expires.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.validate_kind(refresh_token, TokenKind::Refresh)?;
        let account_id = claims.account_id()?;

        let account = match self.bounded(self.repo.get_by_id(account_id)).await {
            Ok(account) => account,
            Err(AuthError::NotFound) => {
                debug!(account_id = %account_id, "refresh for missing account");
                return Err(AuthError::TokenInvalid("account no longer exists".into()));
            }
            Err(e) => return Err(e),
        };

        self.ensure_eligible(&account)?;

        debug!(account_id = %account.id, "session refreshed");
        self.tokens.issue_pair(account.id, &account.email)
    }

    /// Rotate a password after verifying the old one.
    ///
    /// The write is a compare-and-swap on the hash that was just
    /// verified. If another change lands in between, this fails with
    /// `WrongPassword` and the other write stands.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        debug!(account_id = %account_id, "changing password");
        let account = self.bounded(self.repo.get_by_id(account_id)).await?;

        if !password::verify_password(old_password, &account.password_hash) {
            return Err(AuthError::InvalidPassword);
        }
        password::validate_password_strength(new_password, self.config.min_password_length)?;

        let new_hash = password::hash_password(new_password, &self.config)?;
        self.bounded(self.repo.cas_update_password(
            account_id,
            &account.password_hash,
            &new_hash,
        ))
        .await?;

        info!(account_id = %account_id, "password changed");
        Ok(())
    }

    /// Administrative overwrite. Callers must have authenticated the
    /// requester by other means.
    pub async fn reset_password(
        &self,
        account_id: Uuid,
        new_password: &str,
    ) -> Result<(), AuthError> {
        password::validate_password_strength(new_password, self.config.min_password_length)?;
        let new_hash = password::hash_password(new_password, &self.config)?;
        self.bounded(self.repo.set_password(account_id, &new_hash))
            .await?;
        info!(account_id = %account_id, "password reset");
        Ok(())
    }

    pub async fn get_profile(&self, account_id: Uuid) -> Result<Account, AuthError> {
        self.bounded(self.repo.get_by_id(account_id)).await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Account, AuthError> {
        self.bounded(self.repo.get_by_email(email)).await
    }

    pub async fn list(
        &self,
        filter: AccountFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Account>, AuthError> {
        self.bounded(self.repo.list(filter, pagination)).await
    }

    pub async fn update_profile(
        &self,
        account_id: Uuid,
        input: UpdateProfile,
    ) -> Result<Account, AuthError> {
        if input.plan_tier.as_deref().is_some_and(|tier| tier.trim().is_empty()) {
            return Err(AuthError::InvalidInput("plan tier must not be empty".into()));
        }
        let account = self
            .bounded(self.repo.update_profile(account_id, input))
            .await?;
        debug!(account_id = %account_id, "profile updated");
        Ok(account)
    }

    pub async fn merge_metadata(
        &self,
        account_id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), AuthError> {
        if key.trim().is_empty() {
            return Err(AuthError::InvalidInput("metadata key must not be empty".into()));
        }
        self.bounded(self.repo.merge_metadata(account_id, key, value))
            .await?;
        debug!(account_id = %account_id, key, "metadata merged");
        Ok(())
    }

    /// Mark the email verified; a pending account becomes active.
    pub async fn verify_email(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.bounded(self.repo.verify_email(account_id)).await?;
        info!(account_id = %account_id, "email verified");
        Ok(())
    }

    pub async fn suspend(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.transition(
            account_id,
            AccountStatus::Suspended,
            AccountStatus::Suspended.allowed_sources(),
        )
        .await?;
        info!(account_id = %account_id, "account suspended");
        Ok(())
    }

    /// Explicit way back from suspension. Deleted accounts stay deleted.
    pub async fn reactivate(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.transition(account_id, AccountStatus::Active, &[AccountStatus::Suspended])
            .await?;
        info!(account_id = %account_id, "account reactivated");
        Ok(())
    }

    /// Flag the account deleted. Its email becomes available again.
    pub async fn soft_delete(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.transition(
            account_id,
            AccountStatus::Deleted,
            AccountStatus::Deleted.allowed_sources(),
        )
        .await?;
        info!(account_id = %account_id, "account soft deleted");
        Ok(())
    }

    /// Irreversibly remove the account row.
    pub async fn hard_delete(&self, account_id: Uuid) -> Result<(), AuthError> {
        self.bounded(self.repo.hard_delete(account_id)).await?;
        info!(account_id = %account_id, "account deleted");
        Ok(())
    }

    /// Probe storage reachability, bounded like any other call.
    pub async fn health(&self) -> Result<(), AuthError> {
        self.bounded(self.repo.ping()).await
    }

    async fn transition(
        &self,
        account_id: Uuid,
        to: AccountStatus,
        from: &[AccountStatus],
    ) -> Result<(), AuthError> {
        debug_assert!(from.iter().all(|s| s.can_transition_to(to)));
        self.bounded(self.repo.update_status(account_id, to, from))
            .await
    }

    fn ensure_eligible(&self, account: &Account) -> Result<(), AuthError> {
        match account.status {
            AccountStatus::Active => Ok(()),
            AccountStatus::Suspended => Err(AuthError::AccountSuspended),
            AccountStatus::Pending if self.config.require_email_verification => {
                Err(AuthError::AccountPendingVerification)
            }
            AccountStatus::Pending => Ok(()),
            AccountStatus::Deleted => Err(AuthError::InvalidCredentials),
        }
    }
}
