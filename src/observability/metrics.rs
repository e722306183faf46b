use std::time::Instant;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use crate::error::AppError;

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub use_case_total: IntCounterVec,
    pub use_case_latency_seconds: HistogramVec,
    pub delivery_events_total: IntCounterVec,
    pub active_assignments: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let use_case_total = IntCounterVec::new(
            Opts::new("use_case_total", "Use case invocations by outcome"),
            &["use_case", "outcome"],
        )
        .expect("valid use_case_total metric");

        let use_case_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "use_case_latency_seconds",
                "Latency of use case execution in seconds",
            ),
            &["use_case", "outcome"],
        )
        .expect("valid use_case_latency_seconds metric");

        let delivery_events_total = IntCounterVec::new(
            Opts::new("delivery_events_total", "Recorded delivery events by type"),
            &["event_type"],
        )
        .expect("valid delivery_events_total metric");

        let active_assignments = IntGauge::new(
            "active_assignments",
            "Assignments currently pending or accepted",
        )
        .expect("valid active_assignments metric");

        registry
            .register(Box::new(use_case_total.clone()))
            .expect("register use_case_total");
        registry
            .register(Box::new(use_case_latency_seconds.clone()))
            .expect("register use_case_latency_seconds");
        registry
            .register(Box::new(delivery_events_total.clone()))
            .expect("register delivery_events_total");
        registry
            .register(Box::new(active_assignments.clone()))
            .expect("register active_assignments");

        Self {
            registry,
            use_case_total,
            use_case_latency_seconds,
            delivery_events_total,
            active_assignments,
        }
    }

    pub fn observe<T>(&self, use_case: &str, started: Instant, result: &Result<T, AppError>) {
        let outcome = match result {
            Ok(_) => "success",
            Err(err) => err.kind(),
        };

        self.use_case_latency_seconds
            .with_label_values(&[use_case, outcome])
            .observe(started.elapsed().as_secs_f64());
        self.use_case_total
            .with_label_values(&[use_case, outcome])
            .inc();
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::Metrics;
    use crate::error::AppError;

    #[test]
    fn observe_labels_outcome_by_error_kind() {
        let metrics = Metrics::new();
        let ok: Result<(), AppError> = Ok(());
        let failed: Result<(), AppError> = Err(AppError::Conflict("taken".to_string()));

        metrics.observe("offer_assignment", Instant::now(), &ok);
        metrics.observe("offer_assignment", Instant::now(), &failed);

        let success = metrics
            .use_case_total
            .with_label_values(&["offer_assignment", "success"])
            .get();
        let conflict = metrics
            .use_case_total
            .with_label_values(&["offer_assignment", "conflict"])
            .get();
        assert_eq!(success, 1);
        assert_eq!(conflict, 1);
    }

    #[test]
    fn encode_lists_registered_metrics() {
        let metrics = Metrics::new();
        metrics
            .delivery_events_total
            .with_label_values(&["ORDER_PLACED"])
            .inc();

        let body = metrics.encode().unwrap();
        assert!(body.contains("delivery_events_total"));
        assert!(body.contains("active_assignments"));
    }
}
