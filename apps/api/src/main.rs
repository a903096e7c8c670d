mod config;
mod db;
mod documents;
mod errors;
mod generation;
mod llm_client;
mod models;
mod records;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::db::create_pool;
use crate::generation::extractor::{GreedyBraceExtractor, JsonExtractor, StrictJsonExtractor};
use crate::llm_client::LlmClient;
use crate::records::postgres::PgRecordStore;
use crate::records::RecordStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resumate API v{}", env!("CARGO_PKG_VERSION"));

    // Record store: optional, the service still answers without it
    let store = build_store(&config).await;

    // Object storage for PDFs
    let s3 = build_s3_client(&config).await;

    // Initialize LLM client
    let llm = LlmClient::new(
        config.openai_api_key.clone(),
        config.openai_base_url.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?;
    info!(
        "LLM client initialized (model: {}, timeout: {}s)",
        config.openai_model, config.llm_timeout_secs
    );

    let extractor: Arc<dyn JsonExtractor> = if config.strict_json_extraction {
        info!("Using strict JSON extraction");
        Arc::new(StrictJsonExtractor)
    } else {
        Arc::new(GreedyBraceExtractor)
    };

    // Build app state
    let state = AppState {
        store,
        llm: Arc::new(llm),
        extractor,
        s3,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connects to PostgreSQL when `DATABASE_URL` is set. A failed connection is
/// logged and the service runs without a store.
async fn build_store(config: &Config) -> Option<Arc<dyn RecordStore>> {
    let Some(url) = config.database_url.as_deref() else {
        warn!("DATABASE_URL is not set; record-backed endpoints will return 503");
        return None;
    };
    match create_pool(url).await {
        Ok(pool) => Some(Arc::new(PgRecordStore::new(pool))),
        Err(e) => {
            warn!("PostgreSQL unavailable, continuing without a record store: {e}");
            None
        }
    }
}

/// Constructs an S3 client for MinIO (with `S3_ENDPOINT`) or AWS, when credentials are set.
async fn build_s3_client(config: &Config) -> Option<aws_sdk_s3::Client> {
    let (Some(key_id), Some(secret)) = (
        config.aws_access_key_id.as_deref(),
        config.aws_secret_access_key.as_deref(),
    ) else {
        warn!("AWS credentials are not set; PDF endpoints will return 503");
        return None;
    };

    let credentials = Credentials::new(key_id, secret, None, None, "resumate-static");

    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.aws_region.clone()))
        .credentials_provider(credentials);
    if let Some(endpoint) = config.s3_endpoint.as_deref() {
        loader = loader.endpoint_url(endpoint);
    }
    let s3_config = loader.load().await;

    info!("S3 client initialized (bucket: {})", config.s3_bucket);
    Some(aws_sdk_s3::Client::new(&s3_config))
}
