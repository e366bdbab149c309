//! Request-level instrumentation for the HTTP adapter.

use std::time::Duration;

use prometheus::core::Collector;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, exponential_buckets,
};

/// HTTP request metrics, one set per server.
///
/// Same contract as the store metrics: recording is best-effort and never
/// fails the request being observed.
#[derive(Clone)]
pub struct HttpMetrics {
    request_duration: HistogramVec,
    request_errors: IntCounterVec,
    request_size: Histogram,
    response_size: Histogram,
}

impl HttpMetrics {
    /// Build the metric families and register them with `registry`.
    /// Registration failures are logged and swallowed.
    pub fn new(registry: &Registry) -> Self {
        let metrics = Self::unregistered();
        let collectors: [Box<dyn Collector>; 4] = [
            Box::new(metrics.request_duration.clone()),
            Box::new(metrics.request_errors.clone()),
            Box::new(metrics.request_size.clone()),
            Box::new(metrics.response_size.clone()),
        ];
        for collector in collectors {
            if let Err(err) = registry.register(collector) {
                log::warn!("failed to register http metric: {err}");
            }
        }
        metrics
    }

    /// Handles attached to no registry. Useful in tests.
    pub fn unregistered() -> Self {
        let size_buckets = exponential_buckets(64.0, 4.0, 8).expect("valid bucket definition");

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "geotrack_http_request_duration_seconds",
                "HTTP request duration by handler, verb, and status",
            ),
            &["handler", "verb", "status"],
        )
        .expect("valid metric definition");

        let request_errors = IntCounterVec::new(
            Opts::new(
                "geotrack_http_request_errors_total",
                "Total number of valid HTTP requests that could not be served",
            ),
            &["handler", "verb", "status"],
        )
        .expect("valid metric definition");

        let request_size = Histogram::with_opts(
            HistogramOpts::new(
                "geotrack_http_request_size_bytes",
                "Request body size in bytes",
            )
            .buckets(size_buckets.clone()),
        )
        .expect("valid metric definition");

        let response_size = Histogram::with_opts(
            HistogramOpts::new(
                "geotrack_http_response_size_bytes",
                "Response body size in bytes",
            )
            .buckets(size_buckets),
        )
        .expect("valid metric definition");

        Self {
            request_duration,
            request_errors,
            request_size,
            response_size,
        }
    }

    /// Record one completed request. A status of 500 or above also counts
    /// toward the error total.
    pub fn observe(
        &self,
        handler: &str,
        verb: &str,
        status: u16,
        elapsed: Duration,
        bytes_in: u64,
        bytes_out: u64,
    ) {
        let status_label = status.to_string();
        match self
            .request_duration
            .get_metric_with_label_values(&[handler, verb, &status_label])
        {
            Ok(histogram) => histogram.observe(elapsed.as_secs_f64()),
            Err(err) => log::warn!("http metric observation dropped: {err}"),
        }

        self.request_size.observe(bytes_in as f64);
        self.response_size.observe(bytes_out as f64);

        if status >= 500 {
            match self
                .request_errors
                .get_metric_with_label_values(&[handler, verb, &status_label])
            {
                Ok(counter) => counter.inc(),
                Err(err) => log::warn!("http metric increment dropped: {err}"),
            }
        }
    }

    /// Current value of the error counter for one handler/verb/status tuple.
    pub fn error_count(&self, handler: &str, verb: &str, status: u16) -> u64 {
        self.request_errors
            .get_metric_with_label_values(&[handler, verb, &status.to_string()])
            .map(|counter| counter.get())
            .unwrap_or(0)
    }
}
