//! Prometheus metrics for the trust core.
//!
//! Counters register against the default registry on first use.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trust_core_tokens_issued_total",
        "Total number of self-issued tokens",
        &["algorithm"]
    )
    .expect("Failed to register tokens_issued metric")
});

/// Issuance failures counter.
pub static ISSUE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trust_core_issue_failures_total",
        "Total number of token issuance requests that produced no token",
        &["reason"]
    )
    .expect("Failed to register issue_failures metric")
});

/// ID token verifications counter.
pub static ID_TOKEN_VERIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trust_core_id_token_verifications_total",
        "Total number of ID token verifications",
        &["status", "error_code"]
    )
    .expect("Failed to register id_token_verifications metric")
});

/// JWKS fetches counter.
pub static JWKS_FETCHES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trust_core_jwks_fetches_total",
        "Total number of remote JWKS fetches",
        &["status"]
    )
    .expect("Failed to register jwks_fetches metric")
});

/// JWKS fetch duration histogram.
pub static JWKS_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "trust_core_jwks_fetch_duration_seconds",
        "Remote JWKS fetch duration in seconds",
        &["status"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to register jwks_fetch_duration metric")
});

/// Provider resolutions counter.
pub static PROVIDER_RESOLUTIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "trust_core_provider_resolutions_total",
        "Total number of provider lookups",
        &["status"]
    )
    .expect("Failed to register provider_resolutions metric")
});

/// Record a token issuance.
pub fn record_token_issued(algorithm: &str) {
    TOKENS_ISSUED.with_label_values(&[algorithm]).inc();
}

/// Record an issuance request that produced no token.
pub fn record_issue_failure(reason: &str) {
    ISSUE_FAILURES.with_label_values(&[reason]).inc();
}

/// Record an ID token verification. `error_code` is empty on success.
pub fn record_id_token_verification(status: &str, error_code: &str) {
    ID_TOKEN_VERIFICATIONS
        .with_label_values(&[status, error_code])
        .inc();
}

/// Record a JWKS fetch and its duration.
pub fn record_jwks_fetch(status: &str, duration_secs: f64) {
    JWKS_FETCHES.with_label_values(&[status]).inc();
    JWKS_FETCH_DURATION
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Record a provider lookup.
pub fn record_provider_resolution(status: &str) {
    PROVIDER_RESOLUTIONS.with_label_values(&[status]).inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_token_issued() {
        record_token_issued("PS384");
        let value = TOKENS_ISSUED.with_label_values(&["PS384"]).get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_id_token_verification() {
        record_id_token_verification("failure", "ID_TOKEN_EXPIRED");
        let value = ID_TOKEN_VERIFICATIONS
            .with_label_values(&["failure", "ID_TOKEN_EXPIRED"])
            .get();
        assert!(value > 0.0);
    }

    #[test]
    fn test_record_jwks_fetch() {
        record_jwks_fetch("error", 0.2);
        assert!(JWKS_FETCHES.with_label_values(&["error"]).get() > 0.0);
        assert!(
            JWKS_FETCH_DURATION
                .with_label_values(&["error"])
                .get_sample_count()
                > 0
        );

        let names: Vec<String> = prometheus::gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"trust_core_jwks_fetch_duration_seconds".to_string()));
    }
}
