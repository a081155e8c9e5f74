//! Registration, login, session refresh and the caller's own profile.

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use devgate_auth::{RegisterInput, TokenPair};
use devgate_core::models::account::Account;
use devgate_core::repository::AccountRepository;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::ApiResult;
use crate::middleware::AuthContext;
use crate::state::AppState;

// =============================================================================
// Register
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
}

/// POST /auth/register
pub async fn register<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let account = state
        .service
        .register(RegisterInput {
            email: request.email,
            password: Zeroizing::new(request.password),
            full_name: request.full_name,
            company_name: request.company_name,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            email: account.email,
        }),
    ))
}

// =============================================================================
// Login
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub account: Account,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// POST /auth/login
pub async fn login<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let password = Zeroizing::new(request.password);
    let session = state
        .service
        .authenticate(&request.email, &password)
        .await?;

    Ok(Json(LoginResponse {
        account: session.account,
        tokens: session.tokens,
    }))
}

// =============================================================================
// Refresh
// =============================================================================

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// POST /auth/refresh
pub async fn refresh<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<TokenPair>> {
    let tokens = state.service.refresh_session(&request.refresh_token).await?;
    Ok(Json(tokens))
}

// =============================================================================
// Profile
// =============================================================================

/// GET /auth/profile
pub async fn profile<R: AccountRepository + 'static>(
    State(state): State<AppState<R>>,
    Extension(caller): Extension<AuthContext>,
) -> ApiResult<Json<Account>> {
    let account = state.service.get_profile(caller.account_id).await?;
    Ok(Json(account))
}
