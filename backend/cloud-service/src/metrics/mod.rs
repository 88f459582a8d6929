//! Prometheus metrics for cloud-service.
//!
//! Exposes feed and rate-limit collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Time to assemble one feed page, including enrichment.
    pub static ref FEED_PAGE_DURATION_SECONDS: Histogram = register_histogram!(
        "feed_page_duration_seconds",
        "Feed page assembly duration"
    )
    .expect("failed to register feed_page_duration_seconds");

    /// Visible posts per returned page, after orphan filtering.
    pub static ref FEED_PAGE_SIZE: Histogram = register_histogram!(
        "feed_page_size",
        "Number of posts returned per feed page",
        vec![0.0, 1.0, 5.0, 10.0, 20.0, 30.0, 50.0]
    )
    .expect("failed to register feed_page_size");

    /// Rate limiter decisions by policy and outcome (allowed/rejected).
    pub static ref RATE_LIMIT_DECISIONS: IntCounterVec = register_int_counter_vec!(
        "rate_limit_decisions_total",
        "Rate limit decisions segmented by policy and outcome",
        &["policy", "outcome"]
    )
    .expect("failed to register rate_limit_decisions_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
