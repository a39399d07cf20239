use actix_web::HttpResponse;
use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, TextEncoder,
};
use std::time::Duration;

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        Opts::new(
            "feed_service_http_requests_total",
            "Total HTTP requests handled by feed-service",
        ),
        &["method", "path", "status"],
    )
    .expect("failed to create feed_service_http_requests_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register feed_service_http_requests_total");
    counter
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        HistogramOpts::new(
            "feed_service_http_request_duration_seconds",
            "HTTP request latencies for feed-service",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
        ]),
        &["method", "path", "status"],
    )
    .expect("failed to create feed_service_http_request_duration_seconds");
    prometheus::default_registry()
        .register(Box::new(histogram.clone()))
        .expect("failed to register feed_service_http_request_duration_seconds");
    histogram
});

static FEED_CACHE_HITS: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("feed_service_cache_hits_total", "Feed page cache hits")
        .expect("failed to create feed_service_cache_hits_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register feed_service_cache_hits_total");
    counter
});

static FEED_CACHE_MISSES: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("feed_service_cache_misses_total", "Feed page cache misses")
        .expect("failed to create feed_service_cache_misses_total");
    prometheus::default_registry()
        .register(Box::new(counter.clone()))
        .expect("failed to register feed_service_cache_misses_total");
    counter
});

pub fn observe_http_request(method: &str, path: &str, status: u16, elapsed: Duration) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path, &status])
        .observe(elapsed.as_secs_f64());
}

pub fn record_cache_hit() {
    FEED_CACHE_HITS.inc();
}

pub fn record_cache_miss() {
    FEED_CACHE_MISSES.inc();
}

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
