//! Authentication metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use std::{sync::Once, time::Duration};

use metrics::{counter, describe_counter, describe_histogram, histogram};

static METRICS_INIT: Once = Once::new();

/// Login attempts, labelled by `outcome`.
pub const LOGIN_TOTAL: &str = "keyward_login_total";
/// Token verifications, labelled by `outcome`.
pub const VERIFY_TOTAL: &str = "keyward_verify_total";
/// Credential store lookup latency.
pub const STORE_LOOKUP_DURATION: &str = "keyward_store_lookup_duration_seconds";

/// Registers metric descriptions. Safe to call more than once.
pub fn describe() {
    METRICS_INIT.call_once(|| {
        describe_counter!(LOGIN_TOTAL, "Total number of login attempts");
        describe_counter!(VERIFY_TOTAL, "Total number of token verifications");
        describe_histogram!(
            STORE_LOOKUP_DURATION,
            "Duration of credential store lookups in seconds"
        );
    });
}

/// Record a login attempt
///
/// `outcome` is one of `success`, `invalid_credentials` or `store_unavailable`.
pub fn record_login(outcome: &'static str) {
    counter!(LOGIN_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a verification, labelled with [`Verdict::outcome`](crate::Verdict::outcome).
pub fn record_verify(outcome: &'static str) {
    counter!(VERIFY_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a credential store lookup, successful or not.
pub fn record_store_lookup(elapsed: Duration) {
    histogram!(STORE_LOOKUP_DURATION).record(elapsed.as_secs_f64());
}
