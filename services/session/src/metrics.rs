//! Prometheus metrics for the session service.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};

/// Token pairs issued, by reason (`issue` or `rotation`).
pub static PAIRS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_pairs_issued_total",
        "Total number of access/refresh pairs issued",
        &["reason"]
    )
    .expect("Failed to register pairs_issued metric")
});

/// Refresh attempts, by outcome code.
pub static REFRESH_ATTEMPTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_refresh_attempts_total",
        "Total number of refresh attempts",
        &["status"]
    )
    .expect("Failed to register refresh_attempts metric")
});

/// Security events (replays, address changes).
pub static SECURITY_EVENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_security_events_total",
        "Total number of security events",
        &["event_type"]
    )
    .expect("Failed to register security_events metric")
});

/// Anomaly notification deliveries, by status.
pub static NOTIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "session_service_notifications_total",
        "Total number of anomaly notifications attempted",
        &["status"]
    )
    .expect("Failed to register notifications metric")
});

/// HTTP request latency.
pub static HTTP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "session_service_http_latency_seconds",
        "HTTP handler latency in seconds",
        &["route", "status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register http_latency metric")
});

/// Record a successfully issued pair.
pub fn record_pair_issued(reason: &str) {
    PAIRS_ISSUED.with_label_values(&[reason]).inc();
}

/// Record a refresh attempt outcome.
pub fn record_refresh(status: &str) {
    REFRESH_ATTEMPTS.with_label_values(&[status]).inc();
}

/// Record a security event.
pub fn record_security_event(event_type: &str) {
    SECURITY_EVENTS.with_label_values(&[event_type]).inc();
}

/// Record a notification delivery outcome.
pub fn record_notification(status: &str) {
    NOTIFICATIONS.with_label_values(&[status]).inc();
}

/// Observe handler latency.
pub fn observe_latency(route: &str, status: u16, seconds: f64) {
    HTTP_LATENCY
        .with_label_values(&[route, &status.to_string()])
        .observe(seconds);
}

/// Render the default registry in the Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_render() {
        record_pair_issued("issue");
        record_refresh("success");
        record_security_event("refresh_reuse");
        record_notification("sent");
        observe_latency("/session", 200, 0.002);

        let text = render();
        assert!(text.contains("session_service_pairs_issued_total"));
        assert!(text.contains("session_service_refresh_attempts_total"));
        assert!(text.contains("session_service_security_events_total"));
        assert!(text.contains("session_service_http_latency_seconds"));
    }
}
