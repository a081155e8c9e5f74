//! Account management under `/developers`.
//!
//! All routes require a session. Writes that act on the caller's own
//! credentials or profile are restricted to the account itself.
//! Status changes and purges are operator routes; the router puts
//! them behind the operator key.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use devgate_core::models::account::{Account, AccountFilter, AccountStatus, UpdateProfile};
use devgate_core::repository::{AccountRepository, PaginatedResult, Pagination};
use serde::Deserialize;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthContext;
use crate::state::AppState;

fn ensure_self(caller: &AuthContext, id: Uuid) -> ApiResult<()> {
    if caller.account_id != id {
        tracing::debug!(caller = %caller.account_id, target = %id, "cross-account write refused");
        return Err(ApiError::forbidden("cannot modify another account"));
    }
    Ok(())
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub plan_tier: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

/// GET /developers
pub async fn list<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<PaginatedResult<Account>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<AccountStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;

    let filter = AccountFilter {
        status,
        plan_tier: query.plan_tier,
    };
    let pagination = Pagination::from_page(query.page.unwrap_or(1), query.page_size.unwrap_or(0));

    let result = state.service.list(filter, pagination).await?;
    Ok(Json(result))
}

/// GET /developers/{id}
pub async fn get<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Account>> {
    let account = state.service.get_profile(id).await?;
    Ok(Json(account))
}

// =============================================================================
// Self-service writes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub plan_tier: Option<String>,
}

/// PUT /developers/{id}
pub async fn update_profile<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<Json<Account>> {
    ensure_self(&caller, id)?;

    let input = UpdateProfile {
        full_name: request.full_name,
        company_name: request.company_name,
        plan_tier: request.plan_tier,
    };
    if input.is_empty() {
        return Err(ApiError::bad_request("no profile fields given"));
    }

    let account = state.service.update_profile(id, input).await?;
    Ok(Json(account))
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// PUT /developers/{id}/password
pub async fn change_password<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    ensure_self(&caller, id)?;

    let old_password = Zeroizing::new(request.old_password);
    let new_password = Zeroizing::new(request.new_password);
    state
        .service
        .change_password(id, &old_password, &new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub key: String,
    pub value: serde_json::Value,
}

/// POST /developers/{id}/metadata
pub async fn merge_metadata<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(request): Json<MetadataRequest>,
) -> ApiResult<StatusCode> {
    ensure_self(&caller, id)?;
    state
        .service
        .merge_metadata(id, &request.key, request.value)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /developers/{id}
pub async fn soft_delete<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Extension(caller): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    ensure_self(&caller, id)?;
    state.service.soft_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Status management
// =============================================================================

/// DELETE /developers/{id}/purge
pub async fn hard_delete<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.hard_delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /developers/{id}/suspend
pub async fn suspend<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.suspend(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /developers/{id}/reactivate
pub async fn reactivate<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.reactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /developers/{id}/verify
pub async fn verify_email<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.service.verify_email(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
