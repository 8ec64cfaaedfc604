//! Plumbing shared by every HTTP client: one pooled `reqwest::Client` for the whole process
//! and the mapping from HTTP failures to [`GenerationError`].
//!
//! The pooled client is configured for long-lived, low-traffic sessions:
//! - `pool_idle_timeout`: idle connections stay open for 90 seconds
//! - `tcp_keepalive`: keepalive packets every 60 seconds, which outlasts the inter-turn throttle
//! - `timeout`: a whole request may take up to 300 seconds

use lazy_static::lazy_static;
use reqwest::StatusCode;
use std::time::Duration;

use crate::lirith::client_wrapper::GenerationError;
use crate::lirith::services::ClassifierUnavailable;

lazy_static! {
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .build()
        .expect("Failed to build HTTP client");
}

/// The process-wide pooled HTTP client. Clone it freely; clones share the pool.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Map a non-success completion response onto the retry taxonomy.
///
/// Only `429 Too Many Requests` is retryable.
pub fn classify_completion_failure(status: StatusCode, body: &str) -> GenerationError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body_excerpt(body));
    if status == StatusCode::TOO_MANY_REQUESTS {
        GenerationError::RateLimited(detail)
    } else {
        GenerationError::Fatal(detail)
    }
}

/// Map a non-success scoring response onto [`ClassifierUnavailable`].
pub fn classify_service_failure(service: &str, status: StatusCode, body: &str) -> ClassifierUnavailable {
    ClassifierUnavailable::new(
        service,
        format!("HTTP {}: {}", status.as_u16(), body_excerpt(body)),
    )
}

/// First 200 characters of an error body, enough for a log line.
fn body_excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(200) {
        Some((idx, _)) => format!("{}…", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
