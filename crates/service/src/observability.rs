use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

// Prometheus metrics (default registry)
pub static STORE_OPERATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "roster_store_operations_total",
        "Adapter operations issued against the object store",
        &["op"]
    )
    .expect("register store_operations_total")
});

pub static STORE_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "roster_store_failures_total",
        "Adapter operations that returned an error",
        &["op"]
    )
    .expect("register store_failures_total")
});

/// Counts one attempt of `op` and, if it failed, one failure.
pub fn record<T, E>(op: &str, result: &Result<T, E>) {
    STORE_OPERATIONS_TOTAL.with_label_values(&[op]).inc();
    if result.is_err() {
        STORE_FAILURES_TOTAL.with_label_values(&[op]).inc();
    }
}
