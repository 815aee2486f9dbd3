// src/metrics.rs

#[cfg(feature = "observability")]
pub use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

// NOTE: When the observability feature is disabled, the macros below compile
// every call site away.
#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! counter {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
    ($name:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! gauge {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! histogram {
    ($name:expr, $value:expr $(, $label:expr => $label_value:expr)* $(,)?) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_counter {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_gauge {
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
#[macro_export]
macro_rules! describe_histogram {
    ($name:expr, $unit:expr, $desc:expr) => {};
    ($name:expr, $desc:expr) => {};
}

#[cfg(not(feature = "observability"))]
use crate::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};

use std::time::Duration;

/// Installs the Prometheus scrape endpoint on the given port.
#[cfg(feature = "observability")]
pub fn install_prometheus_exporter(port: u16) -> anyhow::Result<()> {
    use metrics_exporter_prometheus::PrometheusBuilder;
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    Ok(())
}

/// Initializes the descriptions for all the metrics in the crate.
/// Call once at startup.
pub fn describe_metrics() {
    describe_counter!(
        "swap_sdk_cache_hits_total",
        "Cache hits, labeled by cache name."
    );
    describe_counter!(
        "swap_sdk_cache_misses_total",
        "Cache misses, labeled by cache name."
    );
    describe_counter!(
        "swap_sdk_quote_failures_total",
        "Candidate paths dropped during quoting, labeled by reason."
    );
    describe_counter!(
        "swap_sdk_session_transitions_total",
        "Session state transitions, labeled by target status."
    );
    describe_gauge!(
        "swap_sdk_routes_found",
        "Routes surviving ranking in the last quote cycle."
    );
    describe_histogram!(
        "swap_sdk_quote_cycle_seconds",
        "Wall-clock duration of a full quote cycle."
    );
}

// Parameters keep a leading underscore so the no-op expansion stays
// warning-free when observability is disabled.
pub fn increment_cache_hit(_cache: &'static str) {
    counter!("swap_sdk_cache_hits_total", 1, "cache" => _cache);
}

pub fn increment_cache_miss(_cache: &'static str) {
    counter!("swap_sdk_cache_misses_total", 1, "cache" => _cache);
}

pub fn increment_quote_failure(_reason: &'static str) {
    counter!("swap_sdk_quote_failures_total", 1, "reason" => _reason);
}

pub fn increment_session_transition(_status: &str) {
    counter!("swap_sdk_session_transitions_total", 1, "status" => _status.to_string());
}

pub fn set_routes_found(_count: f64) {
    gauge!("swap_sdk_routes_found", _count);
}

pub fn record_quote_cycle_duration(_duration: Duration) {
    histogram!("swap_sdk_quote_cycle_seconds", _duration.as_secs_f64());
}
