//! NATS JetStream worker hosting a [`Processor`].
//!
//! Messages in a batch run concurrently, bounded by a semaphore sized to
//! `max_concurrent_jobs` that lives as long as the worker.

use crate::nats::config::WorkerConfig;
use crate::nats::consumer::{NatsConsumer, NatsDelivery, StreamInfo};
use crate::nats::error::NatsError;
use crate::nats::health::{refresh_processor_health, HealthState};
use crate::nats::metrics::NatsMetrics;
use crate::{ErrorCategory, ProcessingError, Processor};
use async_nats::jetstream::Context;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// NATS JetStream worker for processing messages.
pub struct NatsWorker<P: Processor> {
    consumer: NatsConsumer,
    processor: Arc<P>,
    config: WorkerConfig,
    metrics: Arc<NatsMetrics>,
    permits: Arc<Semaphore>,
    health: Option<HealthState>,
}

impl<P: Processor + 'static> NatsWorker<P> {
    /// Create a new NATS worker, creating the stream and consumer if needed.
    pub async fn new(
        jetstream: Context,
        processor: P,
        config: WorkerConfig,
    ) -> Result<Self, NatsError> {
        let metrics = Arc::new(NatsMetrics::new(&config.stream_name, processor.name()));
        let consumer = NatsConsumer::connect(jetstream, config.clone()).await?;
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));

        Ok(Self {
            consumer,
            processor: Arc::new(processor),
            config,
            metrics,
            permits,
            health: None,
        })
    }

    /// Report stream connectivity into a health server's state.
    pub fn with_health(mut self, health: HealthState) -> Self {
        self.health = Some(health);
        self
    }

    /// Run the worker loop until `shutdown` is cancelled.
    ///
    /// The worker will:
    /// 1. Fetch messages in batches
    /// 2. Process each message concurrently (up to max_concurrent_jobs)
    /// 3. Ack on success, nak with backoff on transient failure, term on permanent failure
    /// 4. Hand `shutdown` to every `process` call so in-flight work can abort
    ///
    /// Shutdown only interrupts waiting. Messages already handed to the
    /// processor are settled before this returns.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), NatsError> {
        info!(
            stream = %self.config.stream_name,
            consumer = %self.config.consumer_name,
            max_concurrent = %self.config.max_concurrent_jobs,
            "Starting NATS worker"
        );

        self.check_processor().await;

        while !shutdown.is_cancelled() {
            if let Err(e) = self.process_batch(&shutdown).await {
                error!(error = %e, "Error processing batch");
                self.report_stream(false, Some(e.to_string())).await;
                pause(&shutdown, Duration::from_secs(1)).await;
            }
        }

        info!("Shutdown signal received, NATS worker stopped");
        Ok(())
    }

    /// Refresh the processor's health in the attached health state.
    ///
    /// Returns the processor's health; `true` when no health state is attached.
    pub async fn check_processor(&self) -> bool {
        match &self.health {
            Some(health) => refresh_processor_health(self.processor.as_ref(), health).await,
            None => true,
        }
    }

    async fn report_stream(&self, connected: bool, error: Option<String>) {
        if let Some(health) = &self.health {
            health.set_stream_connected(connected).await;
            health.set_error(error).await;
        }
    }

    /// Fetch one batch and process its messages concurrently.
    async fn process_batch(&self, shutdown: &CancellationToken) -> Result<(), NatsError> {
        let messages = tokio::select! {
            _ = shutdown.cancelled() => return Ok(()),
            fetched = self.consumer.fetch(self.config.batch_size) => fetched?,
        };
        self.report_stream(true, None).await;

        if messages.is_empty() {
            pause(shutdown, Duration::from_millis(100)).await;
            return Ok(());
        }

        let mut handles = Vec::with_capacity(messages.len());

        for message in messages {
            self.metrics.job_received();

            if message.delivery.is_redelivery() {
                debug!(
                    sequence = message.delivery.sequence,
                    attempt = message.delivery.attempt,
                    "Processing redelivered message"
                );
            }

            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| NatsError::JetStream(format!("worker semaphore closed: {e}")))?;
            let processor = self.processor.clone();
            let metrics = self.metrics.clone();
            let cancel = shutdown.child_token();

            let handle = tokio::spawn(async move {
                let result =
                    process_message(message, processor.as_ref(), metrics.as_ref(), &cancel).await;
                drop(permit);
                result
            });

            handles.push(handle);
        }

        for handle in handles {
            match handle.await {
                Ok(Err(e)) => error!(error = %e, "Failed to settle message"),
                Err(e) => error!(error = %e, "Task panicked"),
                Ok(Ok(())) => {}
            }
        }

        Ok(())
    }

    /// Get stream info.
    pub async fn stream_info(&self) -> Result<StreamInfo, NatsError> {
        let info = self.consumer.stream_info().await?;
        self.metrics.stream_depth(info.messages);
        Ok(info)
    }
}

/// Sleep for `duration`, waking early on shutdown.
async fn pause(shutdown: &CancellationToken, duration: Duration) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::time::sleep(duration) => {}
    }
}

async fn process_message<P: Processor>(
    message: NatsDelivery,
    processor: &P,
    metrics: &NatsMetrics,
    cancel: &CancellationToken,
) -> Result<(), NatsError> {
    let sequence = message.delivery.sequence;

    let start = Instant::now();
    let result = processor.process(&message.delivery, cancel).await;
    let duration = start.elapsed();

    match result {
        Ok(()) => {
            message.ack().await?;
            metrics.job_processed(duration);

            debug!(
                sequence = sequence,
                duration_ms = duration.as_millis(),
                "Message processed"
            );
            Ok(())
        }
        Err(e) => settle_failure(message, e, metrics).await,
    }
}

async fn settle_failure(
    message: NatsDelivery,
    error: ProcessingError,
    metrics: &NatsMetrics,
) -> Result<(), NatsError> {
    let sequence = message.delivery.sequence;
    let attempt = message.delivery.attempt;
    let category = error.category();

    metrics.job_failed(&category.to_string());

    match category {
        ErrorCategory::Permanent => {
            warn!(
                sequence = sequence,
                error = %error,
                "Permanent error, terminating message"
            );
            metrics.job_terminated();
            message.term().await
        }
        ErrorCategory::Transient | ErrorCategory::RateLimited => {
            let delay_ms = error.backoff_delay_ms(attempt.saturating_sub(1));

            warn!(
                sequence = sequence,
                error = %error,
                attempt = attempt,
                delay_ms = delay_ms,
                "Processing failed, requesting redelivery"
            );
            metrics.job_retried();
            message
                .nak_with_delay(Duration::from_millis(delay_ms))
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pause_wakes_on_shutdown() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let woke = tokio::time::timeout(
            Duration::from_secs(1),
            pause(&shutdown, Duration::from_secs(3600)),
        )
        .await;
        assert!(woke.is_ok());
    }

    #[tokio::test]
    async fn test_pause_sleeps_without_shutdown() {
        let start = Instant::now();
        pause(&CancellationToken::new(), Duration::from_millis(20)).await;
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
