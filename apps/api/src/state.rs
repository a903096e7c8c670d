use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::extractor::JsonExtractor;
use crate::generation::pipeline::Pipeline;
use crate::llm_client::CompletionProvider;
use crate::records::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; every request gets a cheap clone.
#[derive(Clone)]
pub struct AppState {
    /// `None` when `DATABASE_URL` is unset or the pool could not connect.
    pub store: Option<Arc<dyn RecordStore>>,
    pub llm: Arc<dyn CompletionProvider>,
    pub extractor: Arc<dyn JsonExtractor>,
    /// `None` when no AWS credentials are configured.
    pub s3: Option<S3Client>,
    pub config: Config,
}

impl AppState {
    pub fn store(&self) -> Result<&dyn RecordStore, AppError> {
        self.store
            .as_deref()
            .ok_or_else(|| AppError::StoreUnavailable("Record store is not configured".to_string()))
    }

    pub fn s3(&self) -> Result<&S3Client, AppError> {
        self.s3
            .as_ref()
            .ok_or_else(|| AppError::StoreUnavailable("Object storage is not configured".to_string()))
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            llm: self.llm.as_ref(),
            extractor: self.extractor.as_ref(),
            model: &self.config.openai_model,
        }
    }
}
