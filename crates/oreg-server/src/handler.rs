use axum::response::Json;
use serde_json::json;

/// Health check handler.
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "layout": oreg_storage::LAYOUT_VERSION,
    }))
}

/// OCI base endpoint; an empty object signals API v2 support.
pub async fn base_handler() -> Json<serde_json::Value> {
    Json(json!({}))
}
