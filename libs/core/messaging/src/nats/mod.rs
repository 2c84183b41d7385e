//! NATS JetStream hosting for [`Processor`](crate::Processor)s.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌─────────────────────┐     ┌────────────────┐
//! │   Publisher    │────▶│   NATS JetStream    │────▶│   NatsWorker   │
//! │ (other service)│     │   (Durable Stream)  │     │ (pull consumer)│
//! └────────────────┘     └─────────────────────┘     └────────────────┘
//!                                  ▲                         │
//!                                  │   ack / nak / term      ▼
//!                                  └──────────────── ┌────────────────┐
//!                                                    │   Processor    │
//!                                                    └────────────────┘
//! ```
//!
//! # Key Features
//!
//! - **JetStream Consumers**: durable pull consumer with explicit ack
//! - **Redelivery**: transient failures are NAKed with exponential backoff;
//!   JetStream's `max_deliver` bounds the attempts
//! - **Health Endpoints**: K8s-ready liveness/readiness probes
//! - **Prometheus Metrics**: received, processed, failed, latency histogram
//! - **Graceful Shutdown**: one `CancellationToken` stops the fetch loop and
//!   is forwarded to every in-flight `process` call
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::nats::{NatsWorker, StreamConfig, WorkerConfig};
//!
//! struct EventStream;
//! impl StreamConfig for EventStream {
//!     const STREAM_NAME: &'static str = "EVENTS";
//!     const CONSUMER_NAME: &'static str = "event-worker";
//! }
//!
//! let worker = NatsWorker::new(
//!     jetstream,
//!     processor,
//!     WorkerConfig::from_stream::<EventStream>(),
//! ).await?;
//!
//! worker.run(shutdown_token).await?;
//! ```

mod config;
mod consumer;
mod error;
mod health;
pub mod metrics;
mod worker;

pub use config::{StreamConfig, WorkerConfig};
pub use consumer::{NatsConsumer, NatsDelivery, StreamInfo};
pub use error::NatsError;
pub use health::{refresh_processor_health, HealthServer, HealthState, HealthStatus};
pub use metrics::{init_metrics, NatsMetrics};
pub use worker::NatsWorker;
