use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("codelens_requests_total", "Total number of API requests").unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter =
        register_counter!("codelens_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref AI_FAILURES: Counter =
        register_counter!("codelens_ai_failures_total", "AI provider calls that failed").unwrap();
    pub static ref AI_LATENCY: Histogram = register_histogram!(
        "codelens_ai_latency_seconds",
        "AI provider latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge =
        register_gauge!("codelens_rate_limit_entries", "Live rate limit counters after the last sweep").unwrap();
}
