use axum::body::Bytes;
use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// JSON body for errors produced by the proxy itself
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "ERROR".to_string(),
            message: message.into(),
        }
    }
}

// What gets sent upstream as the form body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    // already url-encoded, passed through as is
    Encoded(Bytes),
    Fields(Vec<(String, String)>),
}

// Outbound request - rebuilt into a reqwest request on every attempt
#[derive(Debug, Clone)]
pub struct ForwardRequest {
    pub method: Method,
    pub url: String,
    pub payload: Payload,
}

impl ForwardRequest {
    /// GET: the inbound query string rides along verbatim.
    pub fn get(base_url: &str, query: Option<&str>) -> Self {
        let url = match query.filter(|q| !q.is_empty()) {
            Some(q) => {
                let sep = if base_url.contains('?') { '&' } else { '?' };
                format!("{base_url}{sep}{q}")
            }
            None => base_url.to_string(),
        };

        Self {
            method: Method::GET,
            url,
            payload: Payload::None,
        }
    }

    pub fn post(base_url: &str, payload: Payload) -> Self {
        Self {
            method: Method::POST,
            url: base_url.to_string(),
            payload,
        }
    }
}

// Upstream answer relayed to the client unchanged
#[derive(Debug, Clone)]
pub struct ForwardResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub backend_configured: bool,
    pub tracked_clients: usize,
}

/// Flattens a JSON object (an `action` plus its fields) into form pairs.
pub fn json_to_fields(object: Map<String, Value>) -> Vec<(String, String)> {
    object
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect()
}
