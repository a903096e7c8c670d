use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::generation::pipeline::Stage;
use crate::llm_client::{ProviderError, ProviderErrorKind};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// The record store or object storage was never configured or could not connect.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Provider error during {stage}: {source}")]
    Provider {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn provider(stage: Stage, source: ProviderError) -> Self {
        AppError::Provider { stage, source }
    }

    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            AppError::Provider { source, .. } if source.kind() == ProviderErrorKind::QuotaExceeded
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::StoreUnavailable(msg) => {
                tracing::warn!("Store unavailable: {msg}");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    msg.clone(),
                )
            }
            AppError::Provider { stage, source } => {
                tracing::error!(stage = %stage, "Provider error: {source}");
                match source.kind() {
                    ProviderErrorKind::QuotaExceeded => (
                        StatusCode::PAYMENT_REQUIRED,
                        "QUOTA_EXCEEDED",
                        "The AI provider quota is exhausted. Check the account's plan and billing."
                            .to_string(),
                    ),
                    ProviderErrorKind::Network => (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_ERROR",
                        "The AI provider could not be reached".to_string(),
                    ),
                    ProviderErrorKind::Other => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "LLM_ERROR",
                        "An AI processing error occurred".to_string(),
                    ),
                }
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_quota_exceeded_maps_to_402() {
        let err = AppError::provider(
            Stage::AwaitingCompletion,
            ProviderError::QuotaExceeded("insufficient_quota".to_string()),
        );
        assert!(err.is_quota_exceeded());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_bad_gateway() {
        let err = AppError::provider(Stage::AwaitingCompletion, ProviderError::Timeout(60));
        assert!(!err.is_quota_exceeded());
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_other_provider_errors_are_500() {
        let err = AppError::provider(
            Stage::AwaitingCompletion,
            ProviderError::Api {
                status: 500,
                message: "boom".to_string(),
            },
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"]["code"], "LLM_ERROR");
    }

    #[tokio::test]
    async fn test_store_unavailable_is_503() {
        let response = AppError::StoreUnavailable("DATABASE_URL is not set".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_not_found_keeps_message() {
        let response = AppError::NotFound("User 1 not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["message"], "User 1 not found");
    }
}
