use axum::extract::State;
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::{TokenPair, UserRole};
use amora_shared::types::ApiResponse;

use crate::models::{NewRefreshToken, RefreshToken, User};
use crate::schema::{refresh_tokens, users};
use crate::services::token_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<ApiResponse<TokenPair>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let presented_hash = token_service::hash_token(&req.refresh_token);
    let stored: RefreshToken = refresh_tokens::table
        .filter(refresh_tokens::token_hash.eq(&presented_hash))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::TokenInvalid, "refresh token not recognized"))?;

    if stored.revoked_at.is_some() {
        return Err(AppError::new(ErrorCode::RefreshTokenRevoked, "refresh token has been revoked"));
    }
    if stored.expires_at < chrono::Utc::now().naive_utc() {
        return Err(AppError::new(ErrorCode::TokenExpired, "refresh token has expired"));
    }

    let user: User = users::table
        .filter(users::id.eq(stored.user_id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::TokenInvalid, "refresh token not recognized"))?;

    if !user.is_active {
        return Err(AppError::new(ErrorCode::AccountDisabled, "account is disabled"));
    }

    // Rotation: the presented token is single-use.
    diesel::update(refresh_tokens::table.filter(refresh_tokens::id.eq(stored.id)))
        .set(refresh_tokens::revoked_at.eq(chrono::Utc::now().naive_utc()))
        .execute(&mut conn)?;

    let role = user.role.parse::<UserRole>().unwrap_or(UserRole::User);
    let (token_pair, refresh_hash) = token_service::create_token_pair(
        user.id,
        role,
        &state.config.jwt_secret,
        state.config.jwt_access_ttl,
    )?;

    let new_rt = NewRefreshToken {
        user_id: user.id,
        token_hash: refresh_hash,
        expires_at: (chrono::Utc::now()
            + chrono::Duration::seconds(state.config.jwt_refresh_ttl))
        .naive_utc(),
    };
    diesel::insert_into(refresh_tokens::table)
        .values(&new_rt)
        .execute(&mut conn)?;

    Ok(Json(ApiResponse::ok(token_pair)))
}
