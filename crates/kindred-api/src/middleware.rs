use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};

use crate::auth::AppState;
use crate::error::ApiError;

/// Extract and validate the bearer token, storing its `Claims` in the
/// request extensions for the handlers behind this layer.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or_else(|| ApiError::Auth("Missing bearer token".into()))?;

    let claims = state.accounts.validate_token(auth.token())?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
