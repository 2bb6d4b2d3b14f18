//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{
    HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bookmarks_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");
    pub static ref DB_QUERY_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bookmarks_db_query_duration_seconds",
            "Database query duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "table"]
    ).expect("metric can be created");

    // Ranking store Metrics
    pub static ref RANKING_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_ranking_operations_total", "Total number of ranking store operations"),
        &["operation", "status"]
    ).expect("metric can be created");
    pub static ref RANKING_OPERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "bookmarks_ranking_operation_duration_seconds",
            "Ranking store operation duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation"]
    ).expect("metric can be created");

    // Domain Metrics
    pub static ref IMAGE_VIEWS_TOTAL: IntCounter = IntCounter::new(
        "bookmarks_image_views_total",
        "Total number of image detail views"
    ).expect("metric can be created");
    pub static ref FOLLOW_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_follow_events_total", "Total number of follow/unfollow events"),
        &["action"]
    ).expect("metric can be created");
    pub static ref LIKE_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_like_events_total", "Total number of like/unlike events"),
        &["action"]
    ).expect("metric can be created");
    pub static ref ACTIONS_RECORDED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_actions_recorded_total", "Total number of activity records appended"),
        &["verb"]
    ).expect("metric can be created");
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "bookmarks_users_total",
        "Total number of active users"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("bookmarks_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; registration happens on the first call.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(DB_QUERIES_TOTAL.clone()))
            .expect("DB_QUERIES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(DB_QUERY_DURATION_SECONDS.clone()))
            .expect("DB_QUERY_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(RANKING_OPERATIONS_TOTAL.clone()))
            .expect("RANKING_OPERATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(RANKING_OPERATION_DURATION_SECONDS.clone()))
            .expect("RANKING_OPERATION_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(IMAGE_VIEWS_TOTAL.clone()))
            .expect("IMAGE_VIEWS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(FOLLOW_EVENTS_TOTAL.clone()))
            .expect("FOLLOW_EVENTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(LIKE_EVENTS_TOTAL.clone()))
            .expect("LIKE_EVENTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ACTIONS_RECORDED_TOTAL.clone()))
            .expect("ACTIONS_RECORDED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(USERS_TOTAL.clone()))
            .expect("USERS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

/// Record the outcome and latency of one ranking store call.
pub fn observe_ranking_operation(operation: &str, ok: bool, elapsed: std::time::Duration) {
    let status = if ok { "ok" } else { "error" };
    RANKING_OPERATIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
    RANKING_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}
