//! NATS JetStream pull consumer.

use crate::nats::config::WorkerConfig;
use crate::nats::error::NatsError;
use crate::processor::Delivery;
use async_nats::jetstream::consumer::pull::Config as ConsumerConfig;
use async_nats::jetstream::consumer::{AckPolicy, PullConsumer};
use async_nats::jetstream::stream::Config as JetStreamConfig;
use async_nats::jetstream::{AckKind, Context, Message};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Durable pull consumer bound to one stream.
pub struct NatsConsumer {
    jetstream: Context,
    consumer: PullConsumer,
    config: WorkerConfig,
}

impl NatsConsumer {
    /// Ensure the stream and durable consumer exist, then bind to them.
    pub async fn connect(jetstream: Context, config: WorkerConfig) -> Result<Self, NatsError> {
        ensure_stream(&jetstream, &config).await?;
        let consumer = ensure_consumer(&jetstream, &config).await?;

        Ok(Self {
            jetstream,
            consumer,
            config,
        })
    }

    /// Fetch up to `batch_size` messages, waiting at most `fetch_timeout`.
    pub async fn fetch(&self, batch_size: usize) -> Result<Vec<NatsDelivery>, NatsError> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(batch_size)
            .expires(self.config.fetch_timeout)
            .messages()
            .await
            .map_err(NatsError::from_jetstream_error)?;

        let mut result = Vec::new();

        while let Some(msg) = messages.next().await {
            match msg {
                Ok(message) => result.push(NatsDelivery::from_message(message)),
                Err(e) => {
                    warn!(error = %e, "Error receiving message");
                }
            }
        }

        Ok(result)
    }

    /// Get stream info.
    pub async fn stream_info(&self) -> Result<StreamInfo, NatsError> {
        let mut stream = self
            .jetstream
            .get_stream(&self.config.stream_name)
            .await
            .map_err(NatsError::from_jetstream_error)?;

        let info = stream
            .info()
            .await
            .map_err(NatsError::from_jetstream_error)?;

        Ok(StreamInfo {
            stream_name: self.config.stream_name.clone(),
            messages: info.state.messages,
            bytes: info.state.bytes,
            consumer_count: info.state.consumer_count,
        })
    }
}

async fn ensure_stream(jetstream: &Context, config: &WorkerConfig) -> Result<(), NatsError> {
    match jetstream.get_stream(&config.stream_name).await {
        Ok(_) => {
            debug!(stream = %config.stream_name, "Stream already exists");
            Ok(())
        }
        Err(_) => {
            info!(
                stream = %config.stream_name,
                subject = %config.subject,
                "Creating stream"
            );

            jetstream
                .create_stream(JetStreamConfig {
                    name: config.stream_name.clone(),
                    subjects: vec![config.subject.clone()],
                    max_messages: 100_000,
                    max_age: Duration::from_secs(7 * 24 * 60 * 60), // 7 days
                    ..Default::default()
                })
                .await
                .map_err(NatsError::from_jetstream_error)?;

            Ok(())
        }
    }
}

async fn ensure_consumer(
    jetstream: &Context,
    config: &WorkerConfig,
) -> Result<PullConsumer, NatsError> {
    let stream = jetstream
        .get_stream(&config.stream_name)
        .await
        .map_err(NatsError::from_jetstream_error)?;

    match stream
        .get_consumer::<ConsumerConfig>(&config.consumer_name)
        .await
    {
        Ok(consumer) => {
            debug!(consumer = %config.consumer_name, "Consumer already exists");
            Ok(consumer)
        }
        Err(_) => {
            info!(
                consumer = %config.consumer_name,
                stream = %config.stream_name,
                "Creating consumer"
            );

            stream
                .create_consumer(ConsumerConfig {
                    durable_name: Some(config.consumer_name.clone()),
                    name: Some(config.consumer_name.clone()),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait: config.ack_wait,
                    max_deliver: config.max_deliver,
                    filter_subject: config.subject.clone(),
                    ..Default::default()
                })
                .await
                .map_err(NatsError::from_jetstream_error)
        }
    }
}

/// A fetched message: the processor-facing [`Delivery`] plus the handle used to ack it.
pub struct NatsDelivery {
    pub delivery: Delivery,
    message: Message,
}

/// JetStream's delivered count as an attempt number, clamped to `1..=u32::MAX`.
fn delivery_attempt(delivered: i64) -> u32 {
    u32::try_from(delivered.max(1)).unwrap_or(u32::MAX)
}

impl NatsDelivery {
    fn from_message(message: Message) -> Self {
        let (sequence, attempt) = match message.info() {
            Ok(info) => (info.stream_sequence, delivery_attempt(info.delivered)),
            Err(e) => {
                warn!(error = %e, "Failed to get message info, using defaults");
                (0, 1)
            }
        };

        let delivery = Delivery {
            payload: message.payload.to_vec(),
            subject: message.subject.to_string(),
            sequence,
            attempt,
        };

        Self { delivery, message }
    }

    /// Acknowledge the message (processing finished, do not redeliver).
    pub async fn ack(self) -> Result<(), NatsError> {
        self.message.ack().await.map_err(NatsError::ack_error)
    }

    /// Negative acknowledge with delay (request redelivery).
    pub async fn nak_with_delay(self, delay: Duration) -> Result<(), NatsError> {
        self.message
            .ack_with(AckKind::Nak(Some(delay)))
            .await
            .map_err(NatsError::ack_error)
    }

    /// Mark as permanently failed (won't be redelivered).
    pub async fn term(self) -> Result<(), NatsError> {
        self.message
            .ack_with(AckKind::Term)
            .await
            .map_err(NatsError::ack_error)
    }
}

/// Stream information.
#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub stream_name: String,
    pub messages: u64,
    pub bytes: u64,
    pub consumer_count: usize,
}
