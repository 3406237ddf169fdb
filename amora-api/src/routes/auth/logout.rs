use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use amora_shared::errors::{AppError, AppResult};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::schema::refresh_tokens;
use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

pub async fn logout(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogoutRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let presented_hash = token_service::hash_token(&req.refresh_token);
    diesel::update(
        refresh_tokens::table
            .filter(refresh_tokens::token_hash.eq(&presented_hash))
            .filter(refresh_tokens::user_id.eq(user.id))
            .filter(refresh_tokens::revoked_at.is_null()),
    )
    .set(refresh_tokens::revoked_at.eq(chrono::Utc::now().naive_utc()))
    .execute(&mut conn)?;

    tracing::info!(user_id = user.id, "user logged out");

    Ok(Json(ApiResponse::ok_with_message((), "logged out")))
}
