use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::error::ForwardError;
use crate::metrics::UPSTREAM_RETRIES;
use crate::models::{ForwardRequest, ForwardResponse, Payload};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Delivers requests to the backend under a per-attempt timeout.
///
/// Only timeouts and transport failures are retried. Any HTTP answer, 5xx
/// included, counts as delivered and is handed back untouched.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    request_timeout: Duration,
    max_retries: u32,
}

impl Forwarder {
    pub fn new(client: reqwest::Client, request_timeout: Duration, max_retries: u32) -> Self {
        Self {
            client,
            request_timeout,
            max_retries,
        }
    }

    pub async fn forward(&self, request: &ForwardRequest) -> Result<ForwardResponse, ForwardError> {
        let mut attempts_remaining = self.max_retries;

        loop {
            match self.attempt(request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempts_remaining > 0 => {
                    attempts_remaining -= 1;
                    UPSTREAM_RETRIES.inc();
                    warn!(url = %request.url, error = %e, "retrying proxy request");
                }
                Err(e) => return Err(e),
            }
        }
    }

    // One bounded attempt, dropping the future on expiry cancels the call
    async fn attempt(&self, request: &ForwardRequest) -> Result<ForwardResponse, ForwardError> {
        timeout(self.request_timeout, self.send(request))
            .await
            .map_err(|_| ForwardError::Timeout {
                after: self.request_timeout,
            })?
    }

    async fn send(&self, request: &ForwardRequest) -> Result<ForwardResponse, ForwardError> {
        let builder = self
            .client
            .request(request.method.clone(), &request.url)
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));

        let builder = match &request.payload {
            Payload::None => builder,
            Payload::Encoded(bytes) => builder.body(bytes.clone()),
            Payload::Fields(fields) => builder.form(fields),
        };

        let res = builder.send().await?;

        let status = res.status();
        // raw value, so non-ASCII parameters survive untouched
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
        let body = res.bytes().await?;

        Ok(ForwardResponse {
            status,
            content_type,
            body,
        })
    }
}
