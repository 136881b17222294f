use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use kindred_types::api::{Claims, Envelope, ProfileFields};

use crate::auth::AppState;
use crate::error::ApiResult;

pub async fn create_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(fields): Json<ProfileFields>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.create_profile(claims.sub, fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Profile created successfully", profile)),
    ))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.get_profile(claims.sub).await?;
    Ok(Json(Envelope::new("Profile retrieved successfully", profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(fields): Json<ProfileFields>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.update_profile(claims.sub, fields).await?;
    Ok(Json(Envelope::new("Profile updated successfully", profile)))
}

pub async fn get_profile_by_id(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let profile = state.profiles.get_profile_by_id(profile_id).await?;
    Ok(Json(Envelope::new("Profile retrieved successfully", profile)))
}
