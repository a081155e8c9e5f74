//! Integration tests for the account lifecycle service using in-memory
//! SurrealDB.

use chrono::{DateTime, Utc};
use devgate_auth::{AccountService, AuthConfig, AuthError, RegisterInput, TokenService};
use devgate_core::error::DevgateResult;
use devgate_core::models::account::{
    Account, AccountFilter, AccountStatus, CreateAccount, UpdateProfile,
};
use devgate_core::repository::{AccountRepository, PaginatedResult, Pagination};
use devgate_db::repository::SurrealAccountRepository;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use tokio::sync::Barrier;
use uuid::Uuid;
use zeroize::Zeroizing;

const SECRET: &str = "integration-test-secret-at-least-32-bytes";

fn test_config() -> AuthConfig {
    AuthConfig {
        argon2_memory_kib: 1024,
        argon2_iterations: 1,
        ..AuthConfig::new(SECRET)
    }
}

async fn repo() -> SurrealAccountRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    devgate_db::run_migrations(&db).await.unwrap();
    SurrealAccountRepository::new(db)
}

async fn setup_with(config: AuthConfig) -> AccountService<SurrealAccountRepository<Db>> {
    let tokens = TokenService::new(&config).unwrap();
    AccountService::new(repo().await, tokens, config)
}

async fn setup() -> AccountService<SurrealAccountRepository<Db>> {
    setup_with(test_config()).await
}

fn register_input(email: &str, password: &str) -> RegisterInput {
    RegisterInput {
        email: email.into(),
        password: Zeroizing::new(password.into()),
        full_name: None,
        company_name: None,
    }
}

#[tokio::test]
async fn register_login_suspend_scenario() {
    let svc = setup().await;

    let account = svc
        .register(register_input("a@b.com", "Passw0rd"))
        .await
        .unwrap();
    assert_eq!(account.status, AccountStatus::Active);
    assert_ne!(account.password_hash, "Passw0rd");
    assert!(account.password_hash.starts_with("$argon2id$"));

    let dup = svc.register(register_input("a@b.com", "Passw0rd")).await;
    assert!(matches!(dup, Err(AuthError::EmailExists)));

    let session = svc.authenticate("a@b.com", "Passw0rd").await.unwrap();
    assert_eq!(session.account.id, account.id);
    let claims = svc.tokens().validate(&session.tokens.access_token).unwrap();
    assert_eq!(claims.account_id().unwrap(), account.id);
    assert_eq!(claims.email, "a@b.com");
    assert_eq!(session.tokens.expires_in, 900);

    let wrong = svc.authenticate("a@b.com", "wrongpass1").await;
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));

    svc.suspend(account.id).await.unwrap();
    let suspended = svc.authenticate("a@b.com", "Passw0rd").await;
    assert!(matches!(suspended, Err(AuthError::AccountSuspended)));

    let refreshed = svc.refresh_session(&session.tokens.refresh_token).await;
    assert!(matches!(refreshed, Err(AuthError::AccountSuspended)));
}

#[tokio::test]
async fn unknown_email_and_wrong_password_are_indistinguishable() {
    let svc = setup().await;
    svc.register(register_input("known@example.com", "Passw0rd"))
        .await
        .unwrap();

    let unknown = svc.authenticate("nobody@example.com", "Passw0rd").await;
    let wrong = svc.authenticate("known@example.com", "Passw0rd!x").await;
    assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));
    assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn wrong_password_does_not_reveal_suspension() {
    let svc = setup().await;
    let account = svc
        .register(register_input("quiet@example.com", "Passw0rd"))
        .await
        .unwrap();
    svc.suspend(account.id).await.unwrap();

    let result = svc.authenticate("quiet@example.com", "nope-nope1").await;
    assert!(matches!(result, Err(AuthError::InvalidCredentials)));
}

#[tokio::test]
async fn register_rejects_policy_violations() {
    let svc = setup().await;

    assert!(matches!(
        svc.register(register_input("not-an-email", "Passw0rd")).await,
        Err(AuthError::InvalidEmail)
    ));
    assert!(matches!(
        svc.register(register_input("short@example.com", "Pw0")).await,
        Err(AuthError::ShortPassword { min: 8 })
    ));
    assert!(matches!(
        svc.register(register_input("digits@example.com", "12345678")).await,
        Err(AuthError::WeakPassword)
    ));
    assert!(matches!(
        svc.register(register_input("letters@example.com", "abcdefgh")).await,
        Err(AuthError::WeakPassword)
    ));

    let listed = svc
        .list(AccountFilter::default(), Pagination::default())
        .await
        .unwrap();
    assert_eq!(listed.total, 0);
}

#[tokio::test]
async fn login_records_last_login() {
    let svc = setup().await;
    let account = svc
        .register(register_input("stamp@example.com", "Passw0rd"))
        .await
        .unwrap();
    assert!(account.last_login_at.is_none());

    svc.authenticate("stamp@example.com", "Passw0rd")
        .await
        .unwrap();
    let profile = svc.get_profile(account.id).await.unwrap();
    assert!(profile.last_login_at.is_some());
}

#[tokio::test]
async fn refresh_issues_new_pair_and_rejects_access_tokens() {
    let svc = setup().await;
    svc.register(register_input("fresh@example.com", "Passw0rd"))
        .await
        .unwrap();
    let session = svc
        .authenticate("fresh@example.com", "Passw0rd")
        .await
        .unwrap();

    let pair = svc
        .refresh_session(&session.tokens.refresh_token)
        .await
        .unwrap();
    assert_ne!(pair.access_token, session.tokens.access_token);

    let with_access = svc.refresh_session(&session.tokens.access_token).await;
    assert!(matches!(with_access, Err(AuthError::TokenInvalid(_))));

    let garbage = svc.refresh_session("not.a.token").await;
    assert!(matches!(garbage, Err(AuthError::TokenInvalid(_))));
}

#[tokio::test]
async fn refresh_after_hard_delete_is_invalid() {
    let svc = setup().await;
    let account = svc
        .register(register_input("purged@example.com", "Passw0rd"))
        .await
        .unwrap();
    let session = svc
        .authenticate("purged@example.com", "Passw0rd")
        .await
        .unwrap();

    svc.hard_delete(account.id).await.unwrap();
    let result = svc.refresh_session(&session.tokens.refresh_token).await;
    assert!(matches!(result, Err(AuthError::TokenInvalid(_))));
}

#[tokio::test]
async fn soft_delete_allows_reregistration() {
    let svc = setup().await;
    let first = svc
        .register(register_input("again@example.com", "Passw0rd"))
        .await
        .unwrap();

    svc.soft_delete(first.id).await.unwrap();
    assert!(matches!(
        svc.authenticate("again@example.com", "Passw0rd").await,
        Err(AuthError::InvalidCredentials)
    ));
    assert!(matches!(
        svc.get_profile(first.id).await,
        Err(AuthError::NotFound)
    ));

    let second = svc
        .register(register_input("again@example.com", "N3wPassword"))
        .await
        .unwrap();
    assert_ne!(second.id, first.id);
    let session = svc
        .authenticate("again@example.com", "N3wPassword")
        .await
        .unwrap();
    assert_eq!(session.account.id, second.id);
}

#[tokio::test]
async fn change_password_rotates_credentials() {
    let svc = setup().await;
    let account = svc
        .register(register_input("rotate@example.com", "Passw0rd"))
        .await
        .unwrap();

    let wrong_old = svc
        .change_password(account.id, "not-it-1", "Rotated99")
        .await;
    assert!(matches!(wrong_old, Err(AuthError::InvalidPassword)));

    let weak_new = svc.change_password(account.id, "Passw0rd", "short").await;
    assert!(matches!(weak_new, Err(AuthError::ShortPassword { .. })));

    svc.change_password(account.id, "Passw0rd", "Rotated99")
        .await
        .unwrap();
    assert!(matches!(
        svc.authenticate("rotate@example.com", "Passw0rd").await,
        Err(AuthError::InvalidCredentials)
    ));
    svc.authenticate("rotate@example.com", "Rotated99")
        .await
        .unwrap();
}

/// Repository that holds every password-change read at a barrier, so all
/// contenders load the same hash before any of them writes.
struct GatedRepository {
    inner: SurrealAccountRepository<Db>,
    gate: Barrier,
}

impl AccountRepository for GatedRepository {
    async fn insert(&self, input: CreateAccount) -> DevgateResult<Account> {
        self.inner.insert(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> DevgateResult<Account> {
        let account = self.inner.get_by_id(id).await?;
        self.gate.wait().await;
        Ok(account)
    }

    async fn get_by_email(&self, email: &str) -> DevgateResult<Account> {
        self.inner.get_by_email(email).await
    }

    async fn list(
        &self,
        filter: AccountFilter,
        pagination: Pagination,
    ) -> DevgateResult<PaginatedResult<Account>> {
        self.inner.list(filter, pagination).await
    }

    async fn cas_update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> DevgateResult<()> {
        self.inner
            .cas_update_password(id, expected_hash, new_hash)
            .await
    }

    async fn set_password(&self, id: Uuid, new_hash: &str) -> DevgateResult<()> {
        self.inner.set_password(id, new_hash).await
    }

    async fn update_profile(&self, id: Uuid, input: UpdateProfile) -> DevgateResult<Account> {
        self.inner.update_profile(id, input).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        from: &[AccountStatus],
    ) -> DevgateResult<()> {
        self.inner.update_status(id, status, from).await
    }

    async fn verify_email(&self, id: Uuid) -> DevgateResult<()> {
        self.inner.verify_email(id).await
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DevgateResult<()> {
        self.inner.update_last_login(id, at).await
    }

    async fn merge_metadata(
        &self,
        id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> DevgateResult<()> {
        self.inner.merge_metadata(id, key, value).await
    }

    async fn hard_delete(&self, id: Uuid) -> DevgateResult<()> {
        self.inner.hard_delete(id).await
    }

    async fn ping(&self) -> DevgateResult<()> {
        self.inner.ping().await
    }
}

const CONTENDERS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn parallel_password_changes_have_exactly_one_winner() {
    let config = test_config();
    let inner = repo().await;
    let account = inner
        .insert(CreateAccount {
            email: "race@example.com".into(),
            password_hash: devgate_auth::password::hash_password("Passw0rd", &config).unwrap(),
            full_name: None,
            company_name: None,
            status: AccountStatus::Active,
            plan_tier: "free".into(),
        })
        .await
        .unwrap();

    let gated = GatedRepository {
        inner,
        gate: Barrier::new(CONTENDERS),
    };
    let tokens = TokenService::new(&config).unwrap();
    let svc = Arc::new(AccountService::new(gated, tokens, config));
    let id = account.id;

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|i| {
            let svc = Arc::clone(&svc);
            tokio::spawn(async move {
                let new_password = format!("Contender{i}");
                let outcome = svc
                    .change_password(id, "Passw0rd", &new_password)
                    .await;
                (new_password, outcome)
            })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        let (new_password, outcome) = handle.await.unwrap();
        match outcome {
            Ok(()) => winners.push(new_password),
            Err(AuthError::WrongPassword) => {}
            Err(other) => panic!("loser must see a stale write, got {other:?}"),
        }
    }
    assert_eq!(winners.len(), 1, "exactly one change must land: {winners:?}");

    svc.authenticate("race@example.com", &winners[0])
        .await
        .unwrap();
    assert!(matches!(
        svc.authenticate("race@example.com", "Passw0rd").await,
        Err(AuthError::InvalidCredentials)
    ));
}

/// Repository that lets one other writer slip in between the read and
/// the compare-and-swap of a password change.
struct RacingRepository {
    inner: SurrealAccountRepository<Db>,
    interloper_hash: String,
    fired: AtomicBool,
}

impl AccountRepository for RacingRepository {
    async fn insert(&self, input: CreateAccount) -> DevgateResult<Account> {
        self.inner.insert(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> DevgateResult<Account> {
        let account = self.inner.get_by_id(id).await?;
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.inner.set_password(id, &self.interloper_hash).await?;
        }
        Ok(account)
    }

    async fn get_by_email(&self, email: &str) -> DevgateResult<Account> {
        self.inner.get_by_email(email).await
    }

    async fn list(
        &self,
        filter: AccountFilter,
        pagination: Pagination,
    ) -> DevgateResult<PaginatedResult<Account>> {
        self.inner.list(filter, pagination).await
    }

    async fn cas_update_password(
        &self,
        id: Uuid,
        expected_hash: &str,
        new_hash: &str,
    ) -> DevgateResult<()> {
        self.inner
            .cas_update_password(id, expected_hash, new_hash)
            .await
    }

    async fn set_password(&self, id: Uuid, new_hash: &str) -> DevgateResult<()> {
        self.inner.set_password(id, new_hash).await
    }

    async fn update_profile(&self, id: Uuid, input: UpdateProfile) -> DevgateResult<Account> {
        self.inner.update_profile(id, input).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: AccountStatus,
        from: &[AccountStatus],
    ) -> DevgateResult<()> {
        self.inner.update_status(id, status, from).await
    }

    async fn verify_email(&self, id: Uuid) -> DevgateResult<()> {
        self.inner.verify_email(id).await
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> DevgateResult<()> {
        self.inner.update_last_login(id, at).await
    }

    async fn merge_metadata(
        &self,
        id: Uuid,
        key: &str,
        value: serde_json::Value,
    ) -> DevgateResult<()> {
        self.inner.merge_metadata(id, key, value).await
    }

    async fn hard_delete(&self, id: Uuid) -> DevgateResult<()> {
        self.inner.hard_delete(id).await
    }

    async fn ping(&self) -> DevgateResult<()> {
        self.inner.ping().await
    }
}

#[tokio::test]
async fn interleaved_password_change_loses_compare_and_swap() {
    let config = test_config();
    let inner = repo().await;
    let interloper_hash = devgate_auth::password::hash_password("Interloper1", &config).unwrap();
    let account = inner
        .insert(CreateAccount {
            email: "cas@example.com".into(),
            password_hash: devgate_auth::password::hash_password("Passw0rd", &config).unwrap(),
            full_name: None,
            company_name: None,
            status: AccountStatus::Active,
            plan_tier: "free".into(),
        })
        .await
        .unwrap();

    let racing = RacingRepository {
        inner,
        interloper_hash,
        fired: AtomicBool::new(false),
    };
    let tokens = TokenService::new(&config).unwrap();
    let svc = AccountService::new(racing, tokens, config);

    let result = svc
        .change_password(account.id, "Passw0rd", "Mine12345")
        .await;
    assert!(matches!(result, Err(AuthError::WrongPassword)));

    // The interleaved write stands.
    svc.authenticate("cas@example.com", "Interloper1")
        .await
        .unwrap();
}

#[tokio::test]
async fn reset_password_overwrites_without_old_password() {
    let svc = setup().await;
    let account = svc
        .register(register_input("forgot@example.com", "Passw0rd"))
        .await
        .unwrap();

    assert!(matches!(
        svc.reset_password(account.id, "weak").await,
        Err(AuthError::ShortPassword { .. })
    ));

    svc.reset_password(account.id, "Recovered1").await.unwrap();
    svc.authenticate("forgot@example.com", "Recovered1")
        .await
        .unwrap();

    assert!(matches!(
        svc.reset_password(Uuid::new_v4(), "Recovered1").await,
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn pending_accounts_need_verification_when_gated() {
    let config = AuthConfig {
        require_email_verification: true,
        ..test_config()
    };
    let svc = setup_with(config).await;

    let account = svc
        .register(register_input("gate@example.com", "Passw0rd"))
        .await
        .unwrap();
    assert_eq!(account.status, AccountStatus::Pending);

    assert!(matches!(
        svc.authenticate("gate@example.com", "Passw0rd").await,
        Err(AuthError::AccountPendingVerification)
    ));

    svc.verify_email(account.id).await.unwrap();
    let session = svc
        .authenticate("gate@example.com", "Passw0rd")
        .await
        .unwrap();
    assert_eq!(session.account.status, AccountStatus::Active);
    assert!(session.account.email_verified);
}

#[tokio::test]
async fn suspended_account_can_be_reactivated() {
    let svc = setup().await;
    let account = svc
        .register(register_input("back@example.com", "Passw0rd"))
        .await
        .unwrap();

    assert!(matches!(
        svc.reactivate(account.id).await,
        Err(AuthError::NotFound)
    ));

    svc.suspend(account.id).await.unwrap();
    svc.reactivate(account.id).await.unwrap();
    svc.authenticate("back@example.com", "Passw0rd")
        .await
        .unwrap();

    svc.soft_delete(account.id).await.unwrap();
    assert!(matches!(
        svc.reactivate(account.id).await,
        Err(AuthError::NotFound)
    ));
}

#[tokio::test]
async fn profile_and_metadata_updates() {
    let svc = setup().await;
    let account = svc
        .register(register_input("meta@example.com", "Passw0rd"))
        .await
        .unwrap();

    let updated = svc
        .update_profile(
            account.id,
            UpdateProfile {
                full_name: Some("Grace Hopper".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("Grace Hopper"));

    assert!(matches!(
        svc.update_profile(
            account.id,
            UpdateProfile {
                plan_tier: Some("  ".into()),
                ..Default::default()
            },
        )
        .await,
        Err(AuthError::InvalidInput(_))
    ));

    svc.merge_metadata(account.id, "source", serde_json::json!("conf"))
        .await
        .unwrap();
    assert!(matches!(
        svc.merge_metadata(account.id, "", serde_json::json!(1)).await,
        Err(AuthError::InvalidInput(_))
    ));

    let profile = svc.get_by_email("meta@example.com").await.unwrap();
    assert_eq!(profile.metadata["source"], "conf");
}
