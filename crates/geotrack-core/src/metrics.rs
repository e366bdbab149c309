//! Store instrumentation over an injected Prometheus registry.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts, Registry};

/// Operation metrics for a telemetry backend.
///
/// Handles are owned, not process-global: construct one per registry at
/// startup and hand it to the backend. Every recording path is best-effort;
/// a broken sink never fails the store operation it observes.
#[derive(Clone)]
pub struct StoreMetrics {
    op_duration: HistogramVec,
    op_errors: IntCounterVec,
    records: IntGaugeVec,
}

impl StoreMetrics {
    /// Build the metric families and register them with `registry`.
    ///
    /// Registration failures (a name collision, for example) are logged and
    /// swallowed; the handles still record locally.
    pub fn new(registry: &Registry) -> Self {
        let metrics = Self::unregistered();
        let collectors: [Box<dyn Collector>; 3] = [
            Box::new(metrics.op_duration.clone()),
            Box::new(metrics.op_errors.clone()),
            Box::new(metrics.records.clone()),
        ];
        for collector in collectors {
            if let Err(err) = registry.register(collector) {
                log::warn!("failed to register store metric: {err}");
            }
        }
        metrics
    }

    /// Handles attached to no registry. Useful in tests.
    pub fn unregistered() -> Self {
        let op_duration = HistogramVec::new(
            HistogramOpts::new(
                "geotrack_store_op_duration_seconds",
                "Duration of backend datastore operations",
            ),
            &["store", "op"],
        )
        .expect("valid metric definition");

        let op_errors = IntCounterVec::new(
            Opts::new(
                "geotrack_store_op_errors_total",
                "Total number of failed datastore operations",
            ),
            &["store", "op"],
        )
        .expect("valid metric definition");

        let records = IntGaugeVec::new(
            Opts::new(
                "geotrack_store_records",
                "Number of unique records currently in the datastore",
            ),
            &["store"],
        )
        .expect("valid metric definition");

        Self {
            op_duration,
            op_errors,
            records,
        }
    }

    /// Record the latency of one store operation.
    pub fn observe_op(&self, store: &str, op: &str, elapsed: Duration) {
        match self.op_duration.get_metric_with_label_values(&[store, op]) {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(err) => log::warn!("store metric observation dropped: {err}"),
        }
    }

    /// Count one failed store operation.
    pub fn inc_error(&self, store: &str, op: &str) {
        match self.op_errors.get_metric_with_label_values(&[store, op]) {
            Ok(counter) => counter.inc(),
            Err(err) => log::warn!("store metric increment dropped: {err}"),
        }
    }

    /// Count one true insert (a key not previously present).
    pub fn inc_records(&self, store: &str) {
        match self.records.get_metric_with_label_values(&[store]) {
            Ok(gauge) => gauge.inc(),
            Err(err) => log::warn!("store metric increment dropped: {err}"),
        }
    }

    /// Subtract records removed by a sweep.
    pub fn sub_records(&self, store: &str, removed: usize) {
        match self.records.get_metric_with_label_values(&[store]) {
            Ok(gauge) => gauge.sub(removed as i64),
            Err(err) => log::warn!("store metric decrement dropped: {err}"),
        }
    }

    /// Current value of the record gauge for one backend.
    pub fn record_count(&self, store: &str) -> i64 {
        self.records
            .get_metric_with_label_values(&[store])
            .map(|gauge| gauge.get())
            .unwrap_or(0)
    }

    /// Current value of the error counter for one backend/operation pair.
    pub fn error_count(&self, store: &str, op: &str) -> u64 {
        self.op_errors
            .get_metric_with_label_values(&[store, op])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }
}
