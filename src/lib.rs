//! Rate limited forwarding proxy for the visitor portal backend.
//!
//! Every browser call goes through `GET|POST /api/proxy`. A request is first
//! checked against the configured backend URL, then against a per-client
//! fixed-window counter, and only then forwarded upstream with a bounded
//! timeout and a single retry on transport failure. Upstream answers, error
//! statuses included, are relayed back byte for byte.

use axum::{Router, routing::get};
use std::sync::Arc;

pub mod client_key;
pub mod config;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod state;

use handlers::{health_handler, metrics_handler, proxy_handler};
use state::AppState;

pub const PROXY_PATH: &str = "/api/proxy";

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(PROXY_PATH, get(proxy_handler).post(proxy_handler))
        .with_state(state)
}
