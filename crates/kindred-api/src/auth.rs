use std::sync::Arc;

use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use kindred_types::api::{Claims, Envelope, LoginRequest, RegisterRequest};

use crate::error::ApiResult;
use crate::service::{AccountService, MessagingService, ProfileService};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub messaging: MessagingService,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let res = state.accounts.register(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.accounts.login(req).await?))
}

/// The caller's own account, without credentials.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let account = state.accounts.get_account_by_id(claims.sub).await?;
    Ok(Json(Envelope::new("User retrieved successfully", account)))
}
