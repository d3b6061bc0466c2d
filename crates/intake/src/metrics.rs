use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

pub static REPORTS_SUBMITTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "intake_reports_submitted_total",
        "Reports accepted and persisted by the intake pipeline"
    )
    .expect("reports_submitted counter")
});

pub static REPORTS_BY_TIER: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "intake_reports_by_tier_total",
        "Persisted reports by authenticity tier",
        &["tier"]
    )
    .expect("reports_by_tier counter")
});

pub static TAGS_EMITTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "intake_tags_emitted_total",
        "Classification tags emitted by the spam pattern rules",
        &["tag"]
    )
    .expect("tags_emitted counter")
});
