use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({ "message": format!("Hello from {}!", env!("CARGO_PKG_NAME")) }))
}

/// GET /health
/// Reports whether the record store is connected, and the service version.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "store_configured": state.store.is_some(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
