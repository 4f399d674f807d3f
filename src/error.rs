use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error;

use crate::models::ErrorBody;

/// Failure to get any HTTP response out of the backend.
#[derive(Error, Debug)]
pub enum ForwardError {
    #[error("upstream did not answer within {after:?}")]
    Timeout { after: Duration },

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Backend not configured")]
    NotConfigured,

    #[error("Too many requests. Please try again later.")]
    RateLimited,

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Payload too large")]
    PayloadTooLarge { limit: usize },

    #[error("Proxy error")]
    Upstream(#[from] ForwardError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::MalformedPayload => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    // Display is the client-facing text; upstream detail stays in the logs
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody::new(self.to_string()))).into_response()
    }
}
