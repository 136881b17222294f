use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use kindred_types::api::{Ack, Claims, EditMessageRequest, Envelope, SendMessageRequest};

use crate::auth::AppState;
use crate::error::ApiResult;

/// `limit` and `offset` for paged listings; the service applies defaults and
/// clamps the limit.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let message = state.messaging.send_message(claims.sub, req).await?;
    Ok((
        StatusCode::CREATED,
        Json(Envelope::new("Message sent successfully", message)),
    ))
}

pub async fn view_messages(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    let messages = state
        .messaging
        .view_messages(claims.sub, conversation_id, page.limit, page.offset)
        .await?;
    Ok(Json(Envelope::new("Messages retrieved successfully", messages)))
}

pub async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<impl IntoResponse> {
    let edited = state.messaging.edit_message(claims.sub, message_id, req).await?;
    Ok(Json(Envelope::new("Message edited successfully", edited)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<impl IntoResponse> {
    state.messaging.delete_message(claims.sub, message_id).await?;
    Ok(Json(Ack::new("Message deleted successfully")))
}
