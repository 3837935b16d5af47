use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

// Prometheus metrics (default registry)
pub static LOGINS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chocomap_logins_total",
        "Login attempts by outcome",
        &["outcome"]
    )
    .expect("register logins_total")
});

pub static DELIVERIES_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chocomap_deliveries_created_total",
        "Total deliveries scheduled"
    )
    .expect("register deliveries_created_total")
});

pub static STATUS_CHANGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chocomap_delivery_status_changes_total",
        "Delivery status changes by target status",
        &["status"]
    )
    .expect("register delivery_status_changes_total")
});

pub static EXTERNAL_LOOKUP_FAILURES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chocomap_external_lookup_failures_total",
        "Failed geocode / distance matrix lookups",
        &["kind"]
    )
    .expect("register external_lookup_failures_total")
});
