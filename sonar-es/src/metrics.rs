//! Operation metrics
//!
//! Prometheus-compatible metrics recorded for every operation that reaches the
//! transport:
//! - request duration per operation kind
//! - request count per kind and outcome
//! - error count per kind and error type
//! - slow request count per kind

use crate::descriptor::OperationKind;
use std::time::{Duration, Instant};

/// Record operation duration
pub fn record_request_duration(kind: OperationKind, duration: Duration) {
    metrics::histogram!(
        "es_request_duration_seconds",
        "kind" => kind.as_str(),
    )
    .record(duration.as_secs_f64());
}

/// Record operation success
pub fn record_request_success(kind: OperationKind) {
    metrics::counter!(
        "es_requests_total",
        "kind" => kind.as_str(),
        "status" => "ok",
    )
    .increment(1);
}

/// Record operation error
pub fn record_request_error(kind: OperationKind, error_type: &'static str) {
    metrics::counter!(
        "es_requests_total",
        "kind" => kind.as_str(),
        "status" => "error",
    )
    .increment(1);

    metrics::counter!(
        "es_request_errors_total",
        "kind" => kind.as_str(),
        "error_type" => error_type,
    )
    .increment(1);
}

/// Record an operation slower than the configured threshold
pub fn record_slow_request(kind: OperationKind) {
    metrics::counter!(
        "es_slow_requests_total",
        "kind" => kind.as_str(),
    )
    .increment(1);
}

/// Record an operation refused because the facade is closed
pub fn record_rejected_closed(kind: OperationKind) {
    metrics::counter!(
        "es_requests_rejected_total",
        "kind" => kind.as_str(),
        "reason" => "closed",
    )
    .increment(1);
}

/// Update the in-flight operation gauge
pub fn record_in_flight(count: usize) {
    metrics::gauge!("es_requests_in_flight").set(count as f64);
}

/// Guard for timing one operation
pub struct OperationTimer {
    kind: OperationKind,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Record success and duration, returning the duration
    pub fn success(self) -> Duration {
        let duration = self.start.elapsed();
        record_request_duration(self.kind, duration);
        record_request_success(self.kind);
        duration
    }

    /// Record error and duration, returning the duration
    pub fn error(self, error_type: &'static str) -> Duration {
        let duration = self.start.elapsed();
        record_request_duration(self.kind, duration);
        record_request_error(self.kind, error_type);
        duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_timer_success() {
        let timer = OperationTimer::new(OperationKind::Search);
        std::thread::sleep(Duration::from_millis(1));
        let elapsed = timer.success();
        assert!(elapsed >= Duration::from_millis(1));
    }

    #[test]
    fn test_operation_timer_error() {
        let timer = OperationTimer::new(OperationKind::Bulk);
        let elapsed = timer.error("connection");
        assert!(elapsed < Duration::from_secs(5));
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // Should not panic
        record_slow_request(OperationKind::Refresh);
        record_rejected_closed(OperationKind::Get);
        record_in_flight(3);
    }
}
