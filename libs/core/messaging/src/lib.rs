//! Queue processing abstractions shared by background workers.
//!
//! This library provides backend-agnostic traits and types for consuming
//! messages off a durable queue:
//! - [`Processor`]: your logic, handed the raw payload of one message
//! - [`ProcessingError`]: categorized failures that drive ack/nak decisions
//! - [`Delivery`]: the payload plus the queue metadata of one attempt
//!
//! With the `nats` feature, [`nats::NatsWorker`] hosts a processor on a
//! NATS JetStream pull consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────────────────┐
//! │   Your Code     │     │           Backend            │
//! │                 │     │                              │
//! │  ┌───────────┐  │     │  ┌────────────────────────┐  │
//! │  │ Processor │◀─│─────│──│ NatsWorker (JetStream) │  │
//! │  └───────────┘  │     │  └────────────────────────┘  │
//! │                 │     │   ack / nak / term by error  │
//! └─────────────────┘     └──────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use messaging::{Delivery, Processor, ProcessingError};
//! use tokio_util::sync::CancellationToken;
//!
//! struct AuditProcessor;
//!
//! #[async_trait]
//! impl Processor for AuditProcessor {
//!     async fn process(
//!         &self,
//!         delivery: &Delivery,
//!         cancel: &CancellationToken,
//!     ) -> Result<(), ProcessingError> { ... }
//!
//!     fn name(&self) -> &'static str { "audit_processor" }
//! }
//!
//! let worker = NatsWorker::new(jetstream, AuditProcessor, config).await?;
//! worker.run(shutdown_token).await?;
//! ```

mod error;
mod processor;

#[cfg(feature = "nats")]
pub mod nats;

pub use error::{ErrorCategory, ProcessingError};
pub use processor::{Delivery, Processor};
