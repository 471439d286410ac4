use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Liveness endpoint; identifies the service and nothing more.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "markdown-service: document to Markdown conversion API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
