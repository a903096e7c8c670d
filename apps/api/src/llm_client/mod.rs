/// LLM Client: single point of entry for all completion-provider calls.
///
/// ARCHITECTURAL RULE: No other module may call the provider API directly.
/// Generation code depends on the `CompletionProvider` trait; `LlmClient` is the
/// production implementation speaking the OpenAI-compatible chat-completions API.
///
/// There is no retry loop. Every call is bounded by a timeout and failures are
/// classified so the HTTP layer can tell quota exhaustion from transient errors.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
#[cfg(test)]
pub mod stub;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Used when `OPENAI_MODEL` is unset. Callers always pass the model explicitly.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Coarse failure class surfaced to the HTTP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    QuotaExceeded,
    Network,
    Other,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider quota exhausted: {0}")]
    QuotaExceeded(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider call timed out after {0}s")]
    Timeout(u64),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn kind(&self) -> ProviderErrorKind {
        match self {
            ProviderError::QuotaExceeded(_) => ProviderErrorKind::QuotaExceeded,
            ProviderError::Http(_) | ProviderError::Timeout(_) => ProviderErrorKind::Network,
            ProviderError::Api { .. } | ProviderError::Malformed(_) => ProviderErrorKind::Other,
        }
    }
}

/// One completion call. `tools` is empty for every generation flow.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub tools: Vec<Value>,
}

impl CompletionRequest {
    pub fn new(prompt: String, model: &str) -> Self {
        Self {
            prompt,
            model: model.to_string(),
            temperature: None,
            tools: Vec::new(),
        }
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub raw_metadata: Value,
}

/// The completion provider seam. Carried in `AppState` as `Arc<dyn CompletionProvider>`.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    tools: &'a [Value],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

/// The production completion client, constructed once at startup.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<Completion, ProviderError> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            tools: &request.tools,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!("Provider returned {status}");
            return Err(classify_failure(status.as_u16(), &text));
        }

        parse_completion(&text)
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, ProviderError> {
        let secs = self.timeout.as_secs();
        let completion = tokio::time::timeout(self.timeout, self.send(&request))
            .await
            .map_err(|_| ProviderError::Timeout(secs))??;

        debug!(
            "Completion succeeded: model={}, chars={}",
            request.model,
            completion.text.len()
        );
        Ok(completion)
    }
}

/// Maps a non-success provider response onto a `ProviderError`.
///
/// 402, and 429 carrying an `insufficient_quota`/billing code, are quota errors.
fn classify_failure(status: u16, body: &str) -> ProviderError {
    let parsed = serde_json::from_str::<ApiErrorEnvelope>(body).ok();
    let is_billing = parsed.as_ref().is_some_and(|e| {
        [e.error.code.as_deref(), e.error.error_type.as_deref()]
            .into_iter()
            .flatten()
            .any(|c| c == "insufficient_quota" || c.starts_with("billing"))
    });
    let message = parsed
        .map(|e| e.error.message)
        .unwrap_or_else(|| body.to_string());

    if status == 402 || (status == 429 && is_billing) {
        ProviderError::QuotaExceeded(message)
    } else {
        ProviderError::Api { status, message }
    }
}

fn parse_completion(body: &str) -> Result<Completion, ProviderError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Malformed(e.to_string()))?;

    let choice = response
        .choices
        .first()
        .ok_or_else(|| ProviderError::Malformed("response contained no choices".to_string()))?;

    let text = choice.message.content.clone().unwrap_or_default();

    Ok(Completion {
        text,
        raw_metadata: json!({
            "id": response.id,
            "model": response.model,
            "finish_reason": choice.finish_reason,
            "usage": response.usage,
        }),
    })
}
