//! Axum route handlers for the Generation API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::analysis::ResumeAnalysis;
use crate::generation::assembly::TailoredResume;
use crate::generation::pipeline::{
    OptimizedExperience, Stage, BEST_POINTER_LIMIT, MAX_POINTER_CHUNKS, POINTER_CHUNK_COUNT,
};
use crate::generation::relevance::RELEVANCE_SELECTION_LIMIT;
use crate::models::resume::{BulletPoint, ResumeItemWithPointers, UserBundle};
use crate::records::{fetch_item_with_pointers, fetch_user_bundle};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ItemJobRequest {
    pub experience_id: Uuid,
    pub job_description: String,
}

#[derive(Debug, Deserialize)]
pub struct PointerChunksRequest {
    pub experience_id: Uuid,
    pub job_description: String,
    pub count: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BestPointersRequest {
    pub experience_id: Uuid,
    pub job_description: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct UserJobRequest {
    pub user_id: Uuid,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct PointerResponse {
    pub pointer: String,
}

#[derive(Debug, Serialize)]
pub struct PointersResponse {
    pub pointers: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BestPointersResponse {
    pub pointers: Vec<BulletPoint>,
}

#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    pub optimized_experiences: Vec<OptimizedExperience>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/generate-one-pointer
pub async fn handle_generate_one_pointer(
    State(state): State<AppState>,
    Json(request): Json<ItemJobRequest>,
) -> Result<Json<PointerResponse>, AppError> {
    require_job_description(&request.job_description)?;
    let item = load_item(&state, request.experience_id).await?;

    let pointer = state
        .pipeline()
        .generate_pointer(&item, &request.job_description)
        .await?;

    Ok(Json(PointerResponse { pointer }))
}

/// POST /api/generate-pointer-chunks
///
/// Generates `count` (default 3, at most 5) variants. Nothing is persisted.
pub async fn handle_generate_pointer_chunks(
    State(state): State<AppState>,
    Json(request): Json<PointerChunksRequest>,
) -> Result<Json<PointersResponse>, AppError> {
    require_job_description(&request.job_description)?;
    let count = request.count.unwrap_or(POINTER_CHUNK_COUNT);
    if count == 0 || count > MAX_POINTER_CHUNKS {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_POINTER_CHUNKS}"
        )));
    }
    let item = load_item(&state, request.experience_id).await?;

    let pointers = state
        .pipeline()
        .generate_pointer_chunks(&item, &request.job_description, count)
        .await?;

    Ok(Json(PointersResponse { pointers }))
}

/// POST /api/select-best-pointers
pub async fn handle_select_best_pointers(
    State(state): State<AppState>,
    Json(request): Json<BestPointersRequest>,
) -> Result<Json<BestPointersResponse>, AppError> {
    require_job_description(&request.job_description)?;
    let limit = request.limit.unwrap_or(BEST_POINTER_LIMIT);
    if limit == 0 {
        return Err(AppError::Validation("limit must be at least 1".to_string()));
    }
    let item = load_item(&state, request.experience_id).await?;

    let pointers = state
        .pipeline()
        .select_best_pointers(&item, &request.job_description, limit)
        .await?;

    Ok(Json(BestPointersResponse { pointers }))
}

/// POST /api/generate-full-resume
///
/// Single provider call; the response is shaped for the front-end editor.
pub async fn handle_generate_full_resume(
    State(state): State<AppState>,
    Json(request): Json<UserJobRequest>,
) -> Result<Json<TailoredResume>, AppError> {
    require_job_description(&request.job_description)?;
    let bundle = load_bundle(&state, request.user_id).await?;

    let resume = state
        .pipeline()
        .generate_full_resume(&bundle, &request.job_description)
        .await?;

    info!(
        "Tailored resume for user {}: {} skills, {} experiences, {} projects",
        request.user_id,
        resume.skills.len(),
        resume.experiences.len(),
        resume.projects.len()
    );
    Ok(Json(resume))
}

/// POST /api/analyze-resume
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Json(request): Json<UserJobRequest>,
) -> Result<Json<ResumeAnalysis>, AppError> {
    require_job_description(&request.job_description)?;
    let bundle = load_bundle(&state, request.user_id).await?;

    let analysis = state
        .pipeline()
        .analyze_resume(&bundle, &request.job_description)
        .await?;

    Ok(Json(analysis))
}

/// POST /api/optimize-experiences
///
/// Relevance selection followed by fresh bullets for each selected item.
pub async fn handle_optimize_experiences(
    State(state): State<AppState>,
    Json(request): Json<UserJobRequest>,
) -> Result<Json<OptimizeResponse>, AppError> {
    require_job_description(&request.job_description)?;
    let bundle = load_bundle(&state, request.user_id).await?;

    let optimized_experiences = state
        .pipeline()
        .optimize_experiences(&bundle, &request.job_description, RELEVANCE_SELECTION_LIMIT)
        .await?;

    Ok(Json(OptimizeResponse {
        optimized_experiences,
    }))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn require_job_description(job_description: &str) -> Result<(), AppError> {
    if job_description.trim().is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

async fn load_item(state: &AppState, item_id: Uuid) -> Result<ResumeItemWithPointers, AppError> {
    info!(stage = %Stage::Fetching, "Loading resume item {item_id}");
    fetch_item_with_pointers(state.store()?, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume item {item_id} not found")))
}

/// A bundle without a user means the user does not exist or the store could not be read.
async fn load_bundle(state: &AppState, user_id: Uuid) -> Result<UserBundle, AppError> {
    info!(stage = %Stage::Fetching, "Loading records for user {user_id}");
    let bundle = fetch_user_bundle(state.store()?, user_id).await;
    if bundle.user.is_none() {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    Ok(bundle)
}
