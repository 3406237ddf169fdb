use axum::extract::{Multipart, State};
use axum::Json;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::sync::Arc;

use amora_shared::clients::storage::UploadCategory;
use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::ApiResponse;

use crate::models::{
    Expectation, ExampleImage, IdealPartnerPhoto, NewExampleImage, NewExpectation,
    NewIdealPartnerPhoto, UpdateExpectation,
};
use crate::schema::{example_images, expectations, ideal_partner_photos};
use crate::services::upload_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ExpectationResponse {
    pub id: i32,
    pub user_id: i32,
    pub description: String,
    pub example_images: Vec<ExampleImage>,
    pub ideal_partner_photos: Vec<IdealPartnerPhoto>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

fn build_response(
    conn: &mut SqliteConnection,
    expectation: Expectation,
) -> AppResult<ExpectationResponse> {
    let images = example_images::table
        .filter(example_images::expectation_id.eq(expectation.id))
        .order(example_images::id.asc())
        .load::<ExampleImage>(conn)?;
    let ideal = ideal_partner_photos::table
        .filter(ideal_partner_photos::expectation_id.eq(expectation.id))
        .order(ideal_partner_photos::id.asc())
        .load::<IdealPartnerPhoto>(conn)?;

    Ok(ExpectationResponse {
        id: expectation.id,
        user_id: expectation.user_id,
        description: expectation.description,
        example_images: images,
        ideal_partner_photos: ideal,
        created_at: expectation.created_at,
        updated_at: expectation.updated_at,
    })
}

fn load_expectation(conn: &mut SqliteConnection, user_id: i32) -> AppResult<Expectation> {
    expectations::table
        .filter(expectations::user_id.eq(user_id))
        .first(conn)
        .map_err(|_| AppError::new(ErrorCode::ExpectationNotFound, "expectations not found"))
}

// --- POST /api/expectations ---

pub async fn create_expectation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ExpectationResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let exists: bool = expectations::table
        .filter(expectations::user_id.eq(user.id))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);

    if exists {
        return Err(AppError::new(ErrorCode::ExpectationAlreadyExists, "expectations already exist"));
    }

    let form = upload_service::read_multipart(multipart).await?;
    let description = form
        .text("description")
        .ok_or_else(|| AppError::new(ErrorCode::ValidationError, "description is required"))?
        .to_string();

    let image_files = form.files_named("example_images");
    upload_service::validate_photo_count(image_files.len(), "example images")?;

    let image_paths =
        upload_service::save_all(&state.storage, UploadCategory::ExampleImage, &image_files).await?;

    let new_expectation = NewExpectation {
        user_id: user.id,
        description,
    };
    let expectation: Expectation = diesel::insert_into(expectations::table)
        .values(&new_expectation)
        .get_result(&mut conn)?;

    let new_images: Vec<NewExampleImage> = image_paths
        .into_iter()
        .map(|file_path| NewExampleImage {
            expectation_id: expectation.id,
            file_path,
        })
        .collect();
    diesel::insert_into(example_images::table)
        .values(&new_images)
        .execute(&mut conn)?;

    tracing::info!(user_id = user.id, expectation_id = expectation.id, "expectations created");

    Ok(Json(ApiResponse::ok(build_response(&mut conn, expectation)?)))
}

// --- GET /api/expectations/me ---

pub async fn get_my_expectation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ExpectationResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let expectation = load_expectation(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(build_response(&mut conn, expectation)?)))
}

// --- PUT /api/expectations/me ---

pub async fn update_my_expectation(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UpdateExpectation>,
) -> AppResult<Json<ApiResponse<ExpectationResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let expectation = load_expectation(&mut conn, user.id)?;
    let updated: Expectation =
        diesel::update(expectations::table.filter(expectations::id.eq(expectation.id)))
            .set((&payload, expectations::updated_at.eq(chrono::Utc::now().naive_utc())))
            .get_result(&mut conn)?;

    Ok(Json(ApiResponse::ok(build_response(&mut conn, updated)?)))
}

// --- PUT /api/expectations/me/ideal-photos ---

/// Replace-all upload of ideal-partner photos, same semantics as profile
/// photo replacement.
pub async fn replace_ideal_photos(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ExpectationResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let expectation = load_expectation(&mut conn, user.id)?;

    let form = upload_service::read_multipart(multipart).await?;
    let photo_files = form.files_named("ideal_photos");
    upload_service::validate_photo_count(photo_files.len(), "ideal partner photos")?;

    let new_paths =
        upload_service::save_all(&state.storage, UploadCategory::IdealPartnerPhoto, &photo_files)
            .await?;

    let old_paths: Vec<String> = ideal_partner_photos::table
        .filter(ideal_partner_photos::expectation_id.eq(expectation.id))
        .select(ideal_partner_photos::file_path)
        .load(&mut conn)?;

    diesel::delete(
        ideal_partner_photos::table
            .filter(ideal_partner_photos::expectation_id.eq(expectation.id)),
    )
    .execute(&mut conn)?;

    let new_photos: Vec<NewIdealPartnerPhoto> = new_paths
        .into_iter()
        .map(|file_path| NewIdealPartnerPhoto {
            expectation_id: expectation.id,
            file_path,
        })
        .collect();
    diesel::insert_into(ideal_partner_photos::table)
        .values(&new_photos)
        .execute(&mut conn)?;

    upload_service::delete_all(&state.storage, &old_paths).await;

    tracing::info!(
        user_id = user.id,
        expectation_id = expectation.id,
        replaced = old_paths.len(),
        "ideal partner photos replaced"
    );

    Ok(Json(ApiResponse::ok(build_response(&mut conn, expectation)?)))
}
