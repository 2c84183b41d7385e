//! Prometheus metrics for the NATS worker.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Metrics for NATS worker.
#[derive(Clone)]
pub struct NatsMetrics {
    stream_name: String,
    processor_name: String,
}

impl NatsMetrics {
    /// Create new metrics.
    pub fn new(stream_name: &str, processor_name: &str) -> Self {
        Self {
            stream_name: stream_name.to_string(),
            processor_name: processor_name.to_string(),
        }
    }

    /// Record a message received.
    pub fn job_received(&self) {
        counter!(
            "nats_worker_jobs_received_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Record a message processed successfully.
    pub fn job_processed(&self, duration: Duration) {
        counter!(
            "nats_worker_jobs_processed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);

        histogram!(
            "nats_worker_job_duration_seconds",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a failed processing attempt.
    pub fn job_failed(&self, error_category: &str) {
        counter!(
            "nats_worker_jobs_failed_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone(),
            "category" => error_category.to_string()
        )
        .increment(1);
    }

    /// Record a message terminated without redelivery.
    pub fn job_terminated(&self) {
        counter!(
            "nats_worker_jobs_terminated_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Record a redelivery request.
    pub fn job_retried(&self) {
        counter!(
            "nats_worker_jobs_retried_total",
            "stream" => self.stream_name.clone(),
            "processor" => self.processor_name.clone()
        )
        .increment(1);
    }

    /// Update stream depth gauge.
    pub fn stream_depth(&self, depth: u64) {
        gauge!(
            "nats_worker_stream_depth",
            "stream" => self.stream_name.clone()
        )
        .set(depth as f64);
    }
}

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let metrics = NatsMetrics::new("NOTIFICATIONS", "notification_dispatcher");
        metrics.job_received();
        metrics.job_processed(Duration::from_millis(12));
        metrics.job_failed("transient");
        metrics.job_retried();
        metrics.job_terminated();
        metrics.stream_depth(3);
    }
}
