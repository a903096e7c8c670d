//! Axum route handlers for reading résumé records and adding bullet points.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::{BulletPoint, NewBulletPoint, ResumeItemWithPointers, UserBundle};
use crate::records::{fetch_item_with_pointers, fetch_user_bundle};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePointRequest {
    pub content: String,
    /// Appended after the existing bullets when omitted.
    pub display_order: Option<i32>,
}

/// GET /api/users/:id/resume-data
pub async fn handle_get_resume_data(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserBundle>, AppError> {
    let bundle = fetch_user_bundle(state.store()?, user_id).await;
    if bundle.user.is_none() {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    Ok(Json(bundle))
}

/// GET /api/resume-items/:id
pub async fn handle_get_resume_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<ResumeItemWithPointers>, AppError> {
    let item = fetch_item_with_pointers(state.store()?, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume item {item_id} not found")))?;
    Ok(Json(item))
}

/// POST /api/resume-items/:id/points
pub async fn handle_create_point(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(request): Json<CreatePointRequest>,
) -> Result<(StatusCode, Json<BulletPoint>), AppError> {
    let content = request.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }

    let store = state.store()?;
    let item = fetch_item_with_pointers(store, item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume item {item_id} not found")))?;

    let display_order = match request.display_order {
        Some(order) => order,
        None => match item.existing_pointers.iter().map(|p| p.display_order).max() {
            Some(last) => last.checked_add(1).ok_or_else(|| {
                AppError::Validation("display_order has no room after the last bullet".to_string())
            })?,
            None => 0,
        },
    };

    let point = store
        .insert_point(NewBulletPoint {
            resume_item_id: item_id,
            user_id: item.item.user_id,
            content: content.to_string(),
            display_order,
        })
        .await?;

    info!("Added bullet {} to resume item {item_id} at position {display_order}", point.id);
    Ok((StatusCode::CREATED, Json(point)))
}
