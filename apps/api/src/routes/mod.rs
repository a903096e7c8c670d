pub mod diagnostics;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::generation::handlers as generation;
use crate::records::handlers as records;
use crate::state::AppState;

/// Uploaded résumé PDFs may exceed axum's 2 MB default.
const PDF_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        // Generation API
        .route(
            "/api/generate-one-pointer",
            post(generation::handle_generate_one_pointer),
        )
        .route(
            "/api/generate-pointer-chunks",
            post(generation::handle_generate_pointer_chunks),
        )
        .route(
            "/api/select-best-pointers",
            post(generation::handle_select_best_pointers),
        )
        .route(
            "/api/generate-full-resume",
            post(generation::handle_generate_full_resume),
        )
        .route("/api/analyze-resume", post(generation::handle_analyze_resume))
        .route(
            "/api/optimize-experiences",
            post(generation::handle_optimize_experiences),
        )
        // Records API
        .route(
            "/api/users/:id/resume-data",
            get(records::handle_get_resume_data),
        )
        .route("/api/resume-items/:id", get(records::handle_get_resume_item))
        .route(
            "/api/resume-items/:id/points",
            post(records::handle_create_point),
        )
        // Documents
        .route(
            "/upload-pdf",
            post(documents::handle_upload_pdf).layer(DefaultBodyLimit::max(PDF_BODY_LIMIT)),
        )
        .route(
            "/download-generated-pdf",
            get(documents::handle_download_generated_pdf),
        )
        .route(
            "/parse-resume",
            post(documents::handle_parse_resume).layer(DefaultBodyLimit::max(PDF_BODY_LIMIT)),
        )
        // Provider diagnostics
        .route("/api/test/ai-payload", post(diagnostics::handle_ai_payload))
        .route("/api/test/ai-default", get(diagnostics::handle_ai_default))
        .route("/api/test/ai-info", get(diagnostics::handle_ai_info))
        .with_state(state)
}
