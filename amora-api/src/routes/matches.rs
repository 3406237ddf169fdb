use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use amora_shared::errors::{AppError, AppResult, ErrorCode};
use amora_shared::types::auth::AuthUser;
use amora_shared::types::pagination::{Paginated, PaginationParams};
use amora_shared::types::ApiResponse;

use crate::models::{Expectation, IdealPartnerPhoto, Match, NewMatch, Photo, Profile};
use crate::schema::{expectations, ideal_partner_photos, matches, photos, profiles, users};
use crate::services::matching::scorer::MatchReasoning;
use crate::services::matching::{rank_candidates, CandidateUser};
use crate::AppState;

fn load_candidate(conn: &mut SqliteConnection, user_id: i32) -> AppResult<Option<CandidateUser>> {
    let profile: Option<Profile> = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first(conn)
        .optional()?;
    let expectation: Option<Expectation> = expectations::table
        .filter(expectations::user_id.eq(user_id))
        .first(conn)
        .optional()?;

    let (Some(profile), Some(expectation)) = (profile, expectation) else {
        return Ok(None);
    };

    let photo_paths: Vec<String> = photos::table
        .filter(photos::profile_id.eq(profile.id))
        .order(photos::order_index.asc())
        .select(photos::file_path)
        .load(conn)?;
    let ideal_photo_paths: Vec<String> = ideal_partner_photos::table
        .filter(ideal_partner_photos::expectation_id.eq(expectation.id))
        .select(ideal_partner_photos::file_path)
        .load(conn)?;

    Ok(Some(CandidateUser {
        user_id,
        profile_text: profile.description,
        expectation_text: expectation.description,
        photo_paths,
        ideal_photo_paths,
    }))
}

/// Candidate pool: every active user other than the seeker who has both a
/// profile and an expectation.
fn load_candidate_pool(conn: &mut SqliteConnection, seeker_id: i32) -> AppResult<Vec<CandidateUser>> {
    let active_ids: Vec<i32> = users::table
        .filter(users::is_active.eq(true))
        .filter(users::id.ne(seeker_id))
        .select(users::id)
        .load(conn)?;

    let candidate_profiles: Vec<Profile> = profiles::table
        .filter(profiles::user_id.eq_any(&active_ids))
        .load(conn)?;
    let candidate_expectations: Vec<Expectation> = expectations::table
        .filter(expectations::user_id.eq_any(&active_ids))
        .load(conn)?;

    let photo_groups = Photo::belonging_to(&candidate_profiles)
        .order(photos::order_index.asc())
        .load::<Photo>(conn)?
        .grouped_by(&candidate_profiles);
    let ideal_groups = IdealPartnerPhoto::belonging_to(&candidate_expectations)
        .load::<IdealPartnerPhoto>(conn)?
        .grouped_by(&candidate_expectations);

    let mut expectation_by_user: HashMap<i32, (Expectation, Vec<IdealPartnerPhoto>)> =
        candidate_expectations
            .into_iter()
            .zip(ideal_groups)
            .map(|(expectation, group)| (expectation.user_id, (expectation, group)))
            .collect();

    let mut candidates = Vec::new();
    for (profile, photo_group) in candidate_profiles.into_iter().zip(photo_groups) {
        if let Some((expectation, ideal_group)) = expectation_by_user.remove(&profile.user_id) {
            candidates.push(CandidateUser {
                user_id: profile.user_id,
                profile_text: profile.description,
                expectation_text: expectation.description,
                photo_paths: photo_group.into_iter().map(|p| p.file_path).collect(),
                ideal_photo_paths: ideal_group.into_iter().map(|p| p.file_path).collect(),
            });
        }
    }

    Ok(candidates)
}

// --- POST /api/matches/generate ---

#[derive(Debug, Serialize)]
pub struct GenerateMatchesResponse {
    pub created: usize,
}

pub async fn generate_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<GenerateMatchesResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let seeker = match load_candidate(&mut conn, user.id)? {
        Some(seeker) => seeker,
        None => {
            let has_profile: bool = profiles::table
                .filter(profiles::user_id.eq(user.id))
                .count()
                .get_result::<i64>(&mut conn)
                .map(|c| c > 0)
                .unwrap_or(false);
            return Err(if has_profile {
                AppError::new(ErrorCode::ExpectationRequired, "please set your expectations first")
            } else {
                AppError::new(ErrorCode::ProfileRequired, "please create your profile first")
            });
        }
    };

    let candidates = load_candidate_pool(&mut conn, user.id)?;
    if candidates.is_empty() {
        return Err(AppError::new(ErrorCode::NoCandidates, "no potential matches found"));
    }

    let ranked = rank_candidates(&state.scorer, &seeker, &candidates).await;

    let mut created = 0;
    for entry in &ranked {
        let exists: bool = matches::table
            .filter(matches::user_id.eq(user.id))
            .filter(matches::matched_user_id.eq(entry.user_id))
            .count()
            .get_result::<i64>(&mut conn)
            .map(|c| c > 0)
            .unwrap_or(false);
        if exists {
            continue;
        }

        let compat = &entry.compatibility;
        let new_match = NewMatch {
            user_id: user.id,
            matched_user_id: entry.user_id,
            compatibility_score: compat.mutual_score,
            text_score: compat.text_score,
            visual_score: compat.visual_score,
            personality_score: compat.personality_score,
            lifestyle_score: compat.lifestyle_score,
            emotional_score: compat.emotional_score,
            longterm_score: compat.longterm_score,
        };
        diesel::insert_into(matches::table)
            .values(&new_match)
            .execute(&mut conn)?;
        created += 1;
    }

    tracing::info!(
        user_id = user.id,
        scored = candidates.len(),
        kept = ranked.len(),
        created,
        "match generation complete"
    );

    Ok(Json(ApiResponse::ok_with_message(
        GenerateMatchesResponse { created },
        format!("generated {created} new matches"),
    )))
}

// --- GET /api/matches ---

#[derive(Debug, Serialize)]
pub struct MatchedProfile {
    pub description: String,
    pub photo_path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MatchSummary {
    pub id: i32,
    pub matched_user_id: i32,
    pub compatibility_score: f64,
    pub text_score: f64,
    pub visual_score: f64,
    pub is_viewed: bool,
    pub created_at: NaiveDateTime,
    pub matched_profile: Option<MatchedProfile>,
}

pub async fn list_matches(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<MatchSummary>>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let total: i64 = matches::table
        .filter(matches::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;

    let rows: Vec<Match> = matches::table
        .filter(matches::user_id.eq(user.id))
        .order(matches::compatibility_score.desc())
        .offset(params.offset() as i64)
        .limit(params.limit() as i64)
        .load(&mut conn)?;

    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        let matched_profile: Option<Profile> = profiles::table
            .filter(profiles::user_id.eq(row.matched_user_id))
            .first(&mut conn)
            .optional()?;

        let matched_profile = match matched_profile {
            Some(profile) => {
                let photo_path: Option<String> = photos::table
                    .filter(photos::profile_id.eq(profile.id))
                    .order(photos::order_index.asc())
                    .select(photos::file_path)
                    .first(&mut conn)
                    .optional()?;
                Some(MatchedProfile {
                    description: profile.description,
                    photo_path,
                })
            }
            None => None,
        };

        items.push(MatchSummary {
            id: row.id,
            matched_user_id: row.matched_user_id,
            compatibility_score: row.compatibility_score,
            text_score: row.text_score,
            visual_score: row.visual_score,
            is_viewed: row.is_viewed,
            created_at: row.created_at,
            matched_profile,
        });
    }

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &params))))
}

// --- GET /api/matches/:match_id/analysis ---

#[derive(Debug, Serialize)]
pub struct MatchScores {
    pub compatibility_score: f64,
    pub text_score: f64,
    pub visual_score: f64,
    pub personality_score: f64,
    pub lifestyle_score: f64,
    pub emotional_score: f64,
    pub longterm_score: f64,
}

#[derive(Debug, Serialize)]
pub struct MatchAnalysisResponse {
    pub match_id: i32,
    pub matched_user_id: i32,
    pub scores: MatchScores,
    pub analysis: MatchReasoning,
    pub created_at: NaiveDateTime,
}

pub async fn get_match_analysis(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i32>,
) -> AppResult<Json<ApiResponse<MatchAnalysisResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let stored: Match = matches::table
        .filter(matches::id.eq(match_id))
        .filter(matches::user_id.eq(user.id))
        .first(&mut conn)
        .map_err(|_| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    let seeker = load_candidate(&mut conn, user.id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileRequired, "please create your profile first"))?;
    let candidate = load_candidate(&mut conn, stored.matched_user_id)?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "matched user profile not found"))?;

    let analysis = state.scorer.detailed_reasoning(&seeker, &candidate, &stored).await;

    Ok(Json(ApiResponse::ok(MatchAnalysisResponse {
        match_id: stored.id,
        matched_user_id: stored.matched_user_id,
        scores: MatchScores {
            compatibility_score: stored.compatibility_score,
            text_score: stored.text_score,
            visual_score: stored.visual_score,
            personality_score: stored.personality_score,
            lifestyle_score: stored.lifestyle_score,
            emotional_score: stored.emotional_score,
            longterm_score: stored.longterm_score,
        },
        analysis,
        created_at: stored.created_at,
    })))
}

// --- PUT /api/matches/:match_id/view ---

pub async fn mark_viewed(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(match_id): Path<i32>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let updated = diesel::update(
        matches::table
            .filter(matches::id.eq(match_id))
            .filter(matches::user_id.eq(user.id)),
    )
    .set(matches::is_viewed.eq(true))
    .execute(&mut conn)?;

    if updated == 0 {
        return Err(AppError::new(ErrorCode::MatchNotFound, "match not found"));
    }

    Ok(Json(ApiResponse::ok_with_message((), "match marked as viewed")))
}

// --- GET /api/matches/stats ---

#[derive(Debug, Serialize)]
pub struct MatchStatsResponse {
    pub total_matches: i64,
    pub viewed_matches: i64,
    pub unviewed_matches: i64,
    pub average_compatibility_score: f64,
}

pub async fn match_stats(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MatchStatsResponse>>> {
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let total: i64 = matches::table
        .filter(matches::user_id.eq(user.id))
        .count()
        .get_result(&mut conn)?;
    let viewed: i64 = matches::table
        .filter(matches::user_id.eq(user.id))
        .filter(matches::is_viewed.eq(true))
        .count()
        .get_result(&mut conn)?;

    let scores: Vec<f64> = matches::table
        .filter(matches::user_id.eq(user.id))
        .select(matches::compatibility_score)
        .load(&mut conn)?;
    let average = if scores.is_empty() {
        0.0
    } else {
        let avg = scores.iter().sum::<f64>() / scores.len() as f64;
        (avg * 1000.0).round() / 1000.0
    };

    Ok(Json(ApiResponse::ok(MatchStatsResponse {
        total_matches: total,
        viewed_matches: viewed,
        unviewed_matches: total - viewed,
        average_compatibility_score: average,
    })))
}
