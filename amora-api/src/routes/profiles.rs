use axum::extract::{Multipart, Path, State};
use axum::Json;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use amora_shared::clients::storage::{UploadCategory, UploadStore};
use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::{NewPhoto, NewProfile, Photo, Profile, UpdateProfile};
use crate::schema::{photos, profiles};
use crate::services::upload_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub audio_clip_path: Option<String>,
    pub photos: Vec<Photo>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProfileResponse {
    fn new(profile: Profile, photos: Vec<Photo>) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            description: profile.description,
            audio_clip_path: profile.audio_clip_path,
            photos,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

fn load_photos(conn: &mut SqliteConnection, profile_id: i32) -> AppResult<Vec<Photo>> {
    Ok(photos::table
        .filter(photos::profile_id.eq(profile_id))
        .order(photos::order_index.asc())
        .load::<Photo>(conn)?)
}

// --- POST /api/profiles ---

pub async fn create_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let exists: bool = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if exists {
        return Err(AppError::new(ErrorCode::ProfileAlreadyExists, "profile already exists"));
    }

    let form = upload_service::read_multipart(multipart).await?;
    let description = form
        .text("description")
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "description is required"))?
        .to_string();

    let photo_files = form.files_named("photos");
    upload_service::validate_photo_count(photo_files.len(), "photos")?;

    // Validate everything before any row or file is created.
    for file in &photo_files {
        UploadStore::validate_extension(UploadCategory::ProfilePhoto, &file.filename)
            .map_err(|e| AppError::new(ErrorCode::InvalidFileType, e))?;
    }
    let audio_file = form.file_named("audio_clip");
    if let Some(audio) = audio_file {
        UploadStore::validate_extension(UploadCategory::AudioClip, &audio.filename)
            .map_err(|e| AppError::new(ErrorCode::InvalidFileType, e))?;
    }

    let audio_clip_path = match audio_file {
        Some(audio) => Some(
            state
                .storage
                .save(UploadCategory::AudioClip, &audio.filename, &audio.data)
                .await
                .map_err(|e| AppError::new(ErrorCode::UploadFailed, e))?,
        ),
        None => None,
    };

    let new_profile = NewProfile {
        user_id: user.id,
        description,
        audio_clip_path,
    };
    let profile: Profile = diesel::insert_into(profiles::table)
        .values(&new_profile)
        .get_result(&mut conn)?;

    let photo_paths =
        upload_service::save_all(&state.storage, UploadCategory::ProfilePhoto, &photo_files).await?;
    let new_photos: Vec<NewPhoto> = photo_paths
        .into_iter()
        .enumerate()
        .map(|(index, file_path)| NewPhoto {
            profile_id: profile.id,
            file_path,
            order_index: index as i32,
        })
        .collect();
    diesel::insert_into(photos::table)
        .values(&new_photos)
        .execute(&mut conn)?;

    let stored_photos = load_photos(&mut conn, profile.id)?;

    tracing::info!(
        user_id = user.id,
        profile_id = profile.id,
        photos = stored_photos.len(),
        "profile created"
    );

    Ok(Json(ApiResponse::ok(ProfileResponse::new(profile, stored_photos))))
}

// --- GET /api/profiles/me ---

pub async fn get_my_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let stored_photos = load_photos(&mut conn, profile.id)?;
    Ok(Json(ApiResponse::ok(ProfileResponse::new(profile, stored_photos))))
}

// --- PUT /api/profiles/me ---

pub async fn update_my_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let updated: Profile = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((&payload, profiles::updated_at.eq(chrono::Utc::now().naive_utc())))
        .get_result(&mut conn)?;

    let stored_photos = load_photos(&mut conn, updated.id)?;
    Ok(Json(ApiResponse::ok(ProfileResponse::new(updated, stored_photos))))
}

// --- GET /api/profiles/:user_id ---

pub async fn get_user_profile(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<i32>,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let stored_photos = load_photos(&mut conn, profile.id)?;
    Ok(Json(ApiResponse::ok(ProfileResponse::new(profile, stored_photos))))
}

// --- PUT /api/profiles/me/photos ---

/// Replace-all: the previous photo rows and their files go away together,
/// the new set gets fresh order indices.
pub async fn replace_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProfileResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let profile: Profile = profiles::table
        .filter(profiles::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;

    let form = upload_service::read_multipart(multipart).await?;
    let photo_files = form.files_named("photos");
    upload_service::validate_photo_count(photo_files.len(), "photos")?;

    let new_paths =
        upload_service::save_all(&state.storage, UploadCategory::ProfilePhoto, &photo_files).await?;

    let old_paths: Vec<String> = photos::table
        .filter(photos::profile_id.eq(profile.id))
        .select(photos::file_path)
        .load(&mut conn)?;

    diesel::delete(photos::table.filter(photos::profile_id.eq(profile.id))).execute(&mut conn)?;

    let new_photos: Vec<NewPhoto> = new_paths
        .into_iter()
        .enumerate()
        .map(|(index, file_path)| NewPhoto {
            profile_id: profile.id,
            file_path,
            order_index: index as i32,
        })
        .collect();
    diesel::insert_into(photos::table)
        .values(&new_photos)
        .execute(&mut conn)?;

    upload_service::delete_all(&state.storage, &old_paths).await;

    let stored_photos = load_photos(&mut conn, profile.id)?;

    tracing::info!(
        user_id = user.id,
        profile_id = profile.id,
        replaced = old_paths.len(),
        photos = stored_photos.len(),
        "profile photos replaced"
    );

    Ok(Json(ApiResponse::ok(ProfileResponse::new(profile, stored_photos))))
}
