//! PDF documents: upload to object storage, download of generated PDFs and
//! text extraction for résumé parsing.

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;

pub mod handlers;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A file part read from a multipart form, plus any text fields seen alongside it.
#[derive(Debug, Default)]
pub struct PdfForm {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub contents: Option<Bytes>,
    pub user_id: Option<String>,
}

impl PdfForm {
    /// Reads `file` and `user_id` parts; anything else is ignored.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = PdfForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    form.file_name = field.file_name().map(str::to_string);
                    form.content_type = field.content_type().map(str::to_string);
                    form.contents = Some(read_bytes(field).await?);
                }
                Some("user_id") => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::Validation(format!("Unreadable user_id: {e}")))?;
                    form.user_id = Some(text.trim().to_string());
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub fn require_pdf(&self) -> Result<Bytes, AppError> {
        if self.content_type.as_deref() != Some(PDF_CONTENT_TYPE) {
            return Err(AppError::Validation("Only PDF files are allowed.".to_string()));
        }
        self.contents
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::Validation("The uploaded file is empty".to_string()))
    }
}

async fn read_bytes(field: Field<'_>) -> Result<Bytes, AppError> {
    field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("Unreadable file part: {e}")))
}

/// `{stem}_upload_{uuid hex}{ext}`, using only the final path component of `original`.
pub fn unique_upload_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("resume.pdf");
    let (stem, ext) = match base.rfind('.') {
        Some(dot) if dot > 0 => base.split_at(dot),
        _ => (base, ""),
    };
    format!("{stem}_upload_{}{ext}", Uuid::new_v4().simple())
}

/// Extracts the text layer of a PDF off the async runtime.
///
/// Malformed input is a validation error, including when the parser panics.
pub async fn extract_pdf_text(contents: Bytes) -> Result<String, AppError> {
    let size = contents.len();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&contents))
        .await
        .map_err(|e| {
            if e.is_panic() {
                warn!("PDF parser panicked on a {size}-byte upload");
                AppError::Validation("The file could not be read as a PDF".to_string())
            } else {
                AppError::Internal(e.into())
            }
        })?
        .map_err(|e| AppError::Validation(format!("The file could not be read as a PDF: {e}")))?;

    let text = text.trim().to_string();
    info!("Extracted {} characters of text from a {size}-byte PDF", text.len());
    Ok(text)
}
