//! Provider diagnostics. These endpoints report provider failures in the body
//! instead of failing the HTTP request.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::llm_client::CompletionRequest;
use crate::state::AppState;

pub const DEFAULT_TEST_PROMPT: &str =
    "Tell me something fascinating about quantum computing and its potential impact on cryptography";

#[derive(Debug, Deserialize)]
pub struct AiPayload {
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Falls back to the configured model.
    pub model: Option<String>,
    pub temperature: Option<f32>,
    #[serde(default)]
    pub tools: Vec<Value>,
}

impl Default for AiPayload {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            model: None,
            temperature: None,
            tools: Vec::new(),
        }
    }
}

fn default_prompt() -> String {
    DEFAULT_TEST_PROMPT.to_string()
}

#[derive(Debug, Serialize)]
pub struct AiPayloadResponse {
    pub success: bool,
    pub prompt: String,
    pub model_used: String,
    pub response: String,
    pub metadata: Value,
    pub error: Option<String>,
}

/// POST /api/test/ai-payload
pub async fn handle_ai_payload(
    State(state): State<AppState>,
    Json(payload): Json<AiPayload>,
) -> Json<AiPayloadResponse> {
    Json(run_payload(&state, payload).await)
}

/// GET /api/test/ai-default
pub async fn handle_ai_default(State(state): State<AppState>) -> Json<AiPayloadResponse> {
    Json(run_payload(&state, AiPayload::default()).await)
}

/// GET /api/test/ai-info
pub async fn handle_ai_info(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service_name": "Provider diagnostics",
        "default_model": state.config.openai_model,
        "default_prompt": DEFAULT_TEST_PROMPT,
        "timeout_secs": state.config.llm_timeout_secs,
        "available_endpoints": [
            "POST /api/test/ai-payload",
            "GET /api/test/ai-default",
            "GET /api/test/ai-info"
        ]
    }))
}

async fn run_payload(state: &AppState, payload: AiPayload) -> AiPayloadResponse {
    let model = payload
        .model
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| state.config.openai_model.clone());
    info!(
        "Diagnostic completion with model {model}: {}",
        payload.prompt.chars().take(50).collect::<String>()
    );

    let request = CompletionRequest::new(payload.prompt.clone(), &model)
        .temperature(payload.temperature)
        .tools(payload.tools);

    match state.llm.complete(request).await {
        Ok(completion) => AiPayloadResponse {
            success: true,
            prompt: payload.prompt,
            model_used: model,
            response: completion.text,
            metadata: completion.raw_metadata,
            error: None,
        },
        Err(e) => {
            warn!("Diagnostic completion failed ({:?}): {e}", e.kind());
            AiPayloadResponse {
                success: false,
                prompt: payload.prompt,
                model_used: model,
                response: String::new(),
                metadata: json!({}),
                error: Some(e.to_string()),
            }
        }
    }
}
