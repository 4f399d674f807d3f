use axum::{Json, extract::State, response::IntoResponse};
use std::sync::Arc;
use crate::models::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        backend_configured: state.backend_url.is_some(),
        tracked_clients: state.rate_limiter.len(),
    })
}
