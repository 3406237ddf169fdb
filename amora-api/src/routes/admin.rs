use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::middleware::AdminUser;
use amora_shared::types::pagination::{Paginated, PaginationParams};
use amora_shared::types::ApiResponse;

use crate::models::User;
use crate::schema::{expectations, matches, profiles, users};
use crate::AppState;

// --- GET /api/admin/stats ---

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub active_users: i64,
    pub total_profiles: i64,
    pub total_expectations: i64,
    pub total_matches: i64,
    pub average_compatibility_score: f64,
}

pub async fn get_stats(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let total_users: i64 = users::table.count().get_result(&mut conn)?;
    let active_users: i64 = users::table
        .filter(users::is_active.eq(true))
        .count()
        .get_result(&mut conn)?;
    let total_profiles: i64 = profiles::table.count().get_result(&mut conn)?;
    let total_expectations: i64 = expectations::table.count().get_result(&mut conn)?;
    let total_matches: i64 = matches::table.count().get_result(&mut conn)?;

    let scores: Vec<f64> = matches::table
        .select(matches::compatibility_score)
        .load(&mut conn)?;
    let average_compatibility_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    Ok(Json(ApiResponse::ok(DashboardStats {
        total_users,
        active_users,
        total_profiles,
        total_expectations,
        total_matches,
        average_compatibility_score,
    })))
}

// --- GET /api/admin/users ---

pub async fn list_users(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<User>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let total: i64 = users::table.count().get_result(&mut conn)?;
    let items: Vec<User> = users::table
        .order(users::created_at.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load(&mut conn)?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

// --- PUT /api/admin/users/:user_id/active ---

#[derive(Debug, Deserialize)]
pub struct SetActiveRequest {
    pub active: bool,
}

pub async fn set_user_active(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
    Json(req): Json<SetActiveRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let updated: User = diesel::update(users::table.filter(users::id.eq(user_id)))
        .set((
            users::is_active.eq(req.active),
            users::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .get_result(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    tracing::info!(user_id, active = req.active, "user active flag changed");

    Ok(Json(ApiResponse::ok(updated)))
}

// --- POST /api/admin/backup ---

#[derive(Debug, Serialize)]
pub struct BackupResponse {
    pub path: String,
}

pub async fn create_backup(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<BackupResponse>>> {
    let backup_dir = std::path::Path::new(&state.config.backup_dir);
    tokio::fs::create_dir_all(backup_dir)
        .await
        .map_err(|e| AppError::internal(format!("failed to create backup dir: {e}")))?;

    let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
    let target = backup_dir.join(format!("amora-{stamp}.db"));
    tokio::fs::copy(&state.config.database_url, &target)
        .await
        .map_err(|e| AppError::internal(format!("backup failed: {e}")))?;

    let path = target.display().to_string();
    tracing::info!(path = %path, "database backup created");

    Ok(Json(ApiResponse::ok(BackupResponse { path })))
}
