use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("proxy_requests_total", "Total number of proxy requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("proxy_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("proxy_upstream_errors_total", "Requests that failed to reach the backend").unwrap();
    pub static ref UPSTREAM_RETRIES: Counter =
        register_counter!("proxy_upstream_retries_total", "Upstream attempts retried after a failure").unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "proxy_request_latency_seconds",
        "Proxy request latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("proxy_tracked_clients", "Clients currently held by the rate limiter").unwrap();
}
