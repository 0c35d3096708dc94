//! Health and status endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

const ENDPOINTS: &[&str] = &[
    "GET /health",
    "GET /api/status",
    "POST /api/auth/login",
    "GET /api/auth/users",
    "GET /api/auth/verify",
    "GET /api/media",
    "POST /api/media/upload",
    "GET /api/media/timeline",
    "GET /api/media/:id",
    "PATCH /api/media/:id",
    "GET /api/relationships",
    "POST /api/relationships",
    "GET /api/relationships/graph",
    "GET /api/relationships/:itemA/:itemB",
    "PUT /api/relationships/:itemA/:itemB",
    "DELETE /api/relationships/:itemA/:itemB",
];

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "uptime": state.started_at.elapsed().as_secs_f64(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn status() -> impl IntoResponse {
    Json(json!({
        "api": "Elephant Knowledge Base",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "timestamp": Utc::now(),
        "endpoints": ENDPOINTS,
    }))
}
