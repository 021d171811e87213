use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

use crate::core::{WorkerError, WorkerResult};

// Fetch decisions by outcome and strategy
static FETCH_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "swcache_fetch_outcomes_total",
        "Intercepted fetches by how they were satisfied",
        &[
            "outcome",  // passthrough, cached, network, unavailable, error
            "strategy", // network_first, stale_while_revalidate, cache_first, none
        ]
    )
    .unwrap()
});

// Background refresh results
static REVALIDATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "swcache_revalidations_total",
        "Background cache refreshes by result",
        &["result"]
    )
    .unwrap()
});

static INSTALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "swcache_installs_total",
        "Shell precache attempts by result",
        &["result"]
    )
    .unwrap()
});

static PURGED_STORES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "swcache_purged_stores_total",
        "Stale stores deleted during activation"
    )
    .unwrap()
});

static UNHANDLED_REJECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "swcache_unhandled_rejections_total",
        "Failed background work per event type",
        &["event"]
    )
    .unwrap()
});

pub fn record_fetch(outcome: &str, strategy: &str) {
    FETCH_OUTCOMES.with_label_values(&[outcome, strategy]).inc();
}

pub fn record_revalidation(result: &str) {
    REVALIDATIONS.with_label_values(&[result]).inc();
}

pub fn record_install(success: bool) {
    let result = if success { "success" } else { "failure" };
    INSTALLS.with_label_values(&[result]).inc();
}

pub fn record_purged_stores(count: usize) {
    PURGED_STORES.inc_by(count as u64);
}

pub fn record_unhandled_rejection(event: &str) {
    UNHANDLED_REJECTIONS.with_label_values(&[event]).inc();
}

pub fn fetch_outcome_count(outcome: &str, strategy: &str) -> u64 {
    FETCH_OUTCOMES.with_label_values(&[outcome, strategy]).get()
}

/// Render every registered metric in the text exposition format.
pub fn gather_text() -> WorkerResult<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| WorkerError::Internal(format!("Failed to encode metrics: {e}")))?;
    String::from_utf8(buffer)
        .map_err(|e| WorkerError::Internal(format!("Metrics are not valid UTF-8: {e}")))
}
