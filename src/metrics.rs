//! Prometheus metrics registry and instruments.
//!
//! Instruments can be used before `init_metrics` runs; registration only
//! makes them visible through `REGISTRY.gather()`.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Content Metrics
    pub static ref CONTENT_SAVES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("opps_content_saves_total", "Total number of content saves"),
        &["table", "operation"]
    ).expect("metric can be created");
    pub static ref REDIRECTS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "opps_redirects_created_total",
        "Total number of redirects created by slug renames"
    ).expect("metric can be created");
    pub static ref CONFIG_LOOKUPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("opps_config_lookups_total", "Total number of config lookups"),
        &["kind", "result"]
    ).expect("metric can be created");

    // Admin Metrics
    pub static ref ADMIN_RULES_APPLIED_TOTAL: IntCounter = IntCounter::new(
        "opps_admin_rules_applied_total",
        "Total number of admin rules applied at registration"
    ).expect("metric can be created");
    pub static ref ADMIN_ACTIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("opps_admin_actions_total", "Total number of admin actions run"),
        &["action", "table"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("opps_errors_total", "Total number of errors"),
        &["error_type", "operation"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(CONTENT_SAVES_TOTAL.clone()))
        .expect("CONTENT_SAVES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(REDIRECTS_CREATED_TOTAL.clone()))
        .expect("REDIRECTS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CONFIG_LOOKUPS_TOTAL.clone()))
        .expect("CONFIG_LOOKUPS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ADMIN_RULES_APPLIED_TOTAL.clone()))
        .expect("ADMIN_RULES_APPLIED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ADMIN_ACTIONS_TOTAL.clone()))
        .expect("ADMIN_ACTIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Render all registered metrics in Prometheus text format
pub fn render() -> Result<String, crate::error::AppError> {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .map_err(|e| crate::error::AppError::Internal(e.into()))?;
    String::from_utf8(buffer).map_err(|e| crate::error::AppError::Internal(e.into()))
}
