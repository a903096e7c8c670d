//! Axum route handlers for PDF upload, download and parsing.

use aws_sdk_s3::primitives::ByteStream;
use axum::{
    extract::{Multipart, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::documents::{extract_pdf_text, unique_upload_name, PdfForm, PDF_CONTENT_TYPE};
use crate::errors::AppError;
use crate::models::resume::UploadedPdf;
use crate::records::RecordStore;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub file_name: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub filename: String,
}

/// POST /upload-pdf
///
/// Multipart form with `file` (application/pdf) and `user_id`. Stores the file
/// under a unique name and links it to the user.
pub async fn handle_upload_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let form = PdfForm::read(multipart).await?;
    let contents = form.require_pdf()?;
    let user_id = form
        .user_id
        .as_deref()
        .ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let user_id = Uuid::parse_str(user_id)
        .map_err(|_| AppError::Validation(format!("user_id '{user_id}' is not a valid UUID")))?;

    let s3 = state.s3()?;
    let store = state.store()?;
    let bucket = &state.config.s3_bucket;
    let file_name = unique_upload_name(form.file_name.as_deref().unwrap_or("resume.pdf"));

    s3.put_object()
        .bucket(bucket)
        .key(&file_name)
        .body(ByteStream::from(contents))
        .content_type(PDF_CONTENT_TYPE)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded s3://{bucket}/{file_name} for user {user_id}");

    link_upload(store, user_id, bucket, &file_name).await?;

    Ok(Json(UploadResponse {
        message: "PDF uploaded and linked to user".to_string(),
        file_name,
    }))
}

/// Records the uploaded object against the user. When the insert fails the
/// object is already in the bucket with nothing pointing at it, so its key is
/// logged for cleanup.
async fn link_upload(
    store: &dyn RecordStore,
    user_id: Uuid,
    bucket: &str,
    file_name: &str,
) -> Result<UploadedPdf, AppError> {
    store
        .insert_uploaded_pdf(user_id, file_name)
        .await
        .map_err(|e| {
            error!("Orphaned upload s3://{bucket}/{file_name}: linking to user {user_id} failed: {e}");
            AppError::from(e)
        })
}

/// GET /download-generated-pdf?filename=
///
/// Any failure to fetch the object is reported as not found.
pub async fn handle_download_generated_pdf(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Result<impl IntoResponse, AppError> {
    if query.filename.trim().is_empty() {
        return Err(AppError::Validation("filename cannot be empty".to_string()));
    }
    let s3 = state.s3()?;

    let object = s3
        .get_object()
        .bucket(&state.config.s3_bucket)
        .key(&query.filename)
        .send()
        .await
        .map_err(|e| AppError::NotFound(format!("PDF not found or error: {e}")))?;

    let contents = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::Storage(format!("S3 download failed: {e}")))?
        .into_bytes();

    info!("Serving {} ({} bytes)", query.filename, contents.len());
    Ok(([(header::CONTENT_TYPE, PDF_CONTENT_TYPE)], contents))
}

/// POST /parse-resume
///
/// Multipart form with a PDF `file`. Returns the provider's structured reading
/// of the résumé, or `{"raw": ...}` when it is not valid JSON.
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = PdfForm::read(multipart).await?;
    let contents = form
        .contents
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Validation("A PDF file is required".to_string()))?;

    let text = extract_pdf_text(contents).await?;
    if text.is_empty() {
        return Err(AppError::Validation(
            "The PDF contains no extractable text".to_string(),
        ));
    }

    let parsed = state.pipeline().parse_resume_text(&text).await?;
    Ok(Json(parsed))
}
