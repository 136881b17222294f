use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use uuid::Uuid;

use kindred_types::api::{Ack, Claims, Envelope};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::messages::PageQuery;

pub async fn list_conversations(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let conversations = state
        .messaging
        .get_conversations(claims.sub, page.limit, page.offset)
        .await?;
    Ok(Json(Envelope::new("Conversations retrieved successfully", conversations)))
}

pub async fn block_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    state.messaging.block_user(claims.sub, user_id).await?;
    Ok(Json(Ack::new("User blocked successfully")))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    state.messaging.unblock_user(claims.sub, user_id).await?;
    Ok(Json(Ack::new("User unblocked successfully")))
}
