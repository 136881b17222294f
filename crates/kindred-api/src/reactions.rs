use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use kindred_types::api::{Claims, Envelope, ReactionRequest};

use crate::auth::AppState;
use crate::error::ApiResult;

#[derive(Debug, Deserialize)]
pub struct EmojiQuery {
    #[serde(default)]
    pub emoji: String,
}

pub async fn add_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let reactions = state
        .messaging
        .add_reaction(claims.sub, message_id, &req.emoji)
        .await?;
    Ok(Json(Envelope::new("Reaction added successfully", reactions)))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Query(query): Query<EmojiQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let reactions = state
        .messaging
        .remove_reaction(claims.sub, message_id, &query.emoji)
        .await?;
    Ok(Json(Envelope::new("Reaction removed successfully", reactions)))
}
