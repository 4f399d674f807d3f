use std::sync::Arc;
use crate::config::Args;
use crate::forward::Forwarder;
use crate::rate_limit::RateLimiter;

// app's shared state
pub struct AppState {
    pub backend_url: Option<String>,   // None until GAS_BACKEND_URL is set
    pub forwarder: Forwarder,
    pub rate_limiter: Arc<RateLimiter>,
    pub max_body_bytes: usize,
}

impl AppState {
    pub fn new(args: &Args, client: reqwest::Client) -> Arc<Self> {
        Arc::new(Self {
            backend_url: args.backend(),
            forwarder: Forwarder::new(client, args.request_timeout(), args.max_retries),
            rate_limiter: Arc::new(RateLimiter::new(args.rate_limit, args.rate_window())),
            max_body_bytes: args.max_body_bytes,
        })
    }
}
