use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::client_key::client_key;
use crate::error::ProxyError;
use crate::metrics::{RATE_LIMITED, REQUEST_LATENCY, REQUEST_TOTAL, TRACKED_CLIENTS, UPSTREAM_ERRORS};
use crate::models::{ForwardRequest, ForwardResponse, Payload, json_to_fields};
use crate::rate_limit::Admission;
use crate::state::AppState;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub async fn proxy_handler(State(state): State<Arc<AppState>>, request: Request) -> Response {
    REQUEST_TOTAL.inc();
    let start_time = Instant::now();

    let method = request.method().clone();
    let path = request.uri().to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(request.headers(), peer);

    let result = relay(&state, &client, request).await;

    let elapsed = start_time.elapsed();
    let elapsed_ms = elapsed.as_millis() as u64;
    REQUEST_LATENCY.observe(elapsed.as_secs_f64());

    match result {
        Ok(res) => {
            info!(%method, %path, %client, status = res.status.as_u16(), elapsed_ms, "proxied request");
            (res.status, [(CONTENT_TYPE, res.content_type)], res.body).into_response()
        }
        Err(e) => {
            match &e {
                ProxyError::Upstream(detail) => {
                    UPSTREAM_ERRORS.inc();
                    error!(%method, %path, %client, status = "ERROR", elapsed_ms, error = %detail, "proxy error");
                }
                ProxyError::RateLimited => {
                    RATE_LIMITED.inc();
                    warn!(%method, %path, %client, status = e.status().as_u16(), elapsed_ms, "rate limited");
                }
                ProxyError::PayloadTooLarge { limit } => {
                    warn!(%method, %path, %client, status = e.status().as_u16(), elapsed_ms, limit, "payload exceeded body limit");
                }
                ProxyError::NotConfigured | ProxyError::MalformedPayload => {
                    warn!(%method, %path, %client, status = e.status().as_u16(), elapsed_ms, reason = %e, "request refused");
                }
            }
            e.into_response()
        }
    }
}

// config check, then admission, then delivery; nothing goes upstream before both pass
async fn relay(state: &AppState, client: &str, request: Request) -> Result<ForwardResponse, ProxyError> {
    let base_url = state.backend_url.as_deref().ok_or(ProxyError::NotConfigured)?;

    let admission = state.rate_limiter.check_and_record(client);
    TRACKED_CLIENTS.set(state.rate_limiter.len() as f64);
    if admission == Admission::Rejected {
        return Err(ProxyError::RateLimited);
    }

    let outbound = build_outbound(base_url, request, state.max_body_bytes).await?;

    Ok(state.forwarder.forward(&outbound).await?)
}

async fn build_outbound(base_url: &str, request: Request, max_body_bytes: usize) -> Result<ForwardRequest, ProxyError> {
    let method = request.method().clone();

    if method != Method::POST {
        let query = request.uri().query().map(str::to_string);
        return Ok(ForwardRequest {
            method,
            ..ForwardRequest::get(base_url, query.as_deref())
        });
    }

    let is_form = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));

    let body = Limited::new(request.into_body(), max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ProxyError::PayloadTooLarge { limit: max_body_bytes }
            } else {
                ProxyError::MalformedPayload
            }
        })?
        .to_bytes();

    Ok(ForwardRequest::post(base_url, decode_payload(body, is_form)?))
}

fn decode_payload(body: axum::body::Bytes, is_form: bool) -> Result<Payload, ProxyError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Payload::Fields(Vec::new()));
    }

    if is_form {
        std::str::from_utf8(&body).map_err(|_| ProxyError::MalformedPayload)?;
        return Ok(Payload::Encoded(body));
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(Value::Object(object)) => Ok(Payload::Fields(json_to_fields(object))),
        _ => Err(ProxyError::MalformedPayload),
    }
}
