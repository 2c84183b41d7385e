//! Queue hosting for the [`EventDispatcher`].
//!
//! Implements `messaging::Processor` so the dispatcher can run under any
//! messaging backend, including the NATS JetStream worker.

use crate::dispatcher::EventDispatcher;
use async_trait::async_trait;
use messaging::{Delivery, ProcessingError, Processor};
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[async_trait]
impl Processor for EventDispatcher {
    async fn process(
        &self,
        delivery: &Delivery,
        cancel: &CancellationToken,
    ) -> Result<(), ProcessingError> {
        debug!(
            subject = %delivery.subject,
            sequence = delivery.sequence,
            attempt = delivery.attempt,
            "Dispatching notification event"
        );

        self.dispatch(&delivery.payload, cancel)
            .await
            .map_err(ProcessingError::from)
    }

    fn name(&self) -> &'static str {
        "notification_dispatcher"
    }

    async fn health_check(&self) -> Result<bool, ProcessingError> {
        self.sender()
            .health_check()
            .await
            .map_err(|e| ProcessingError::transient(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockEmailSender;
    use messaging::ErrorCategory;
    use std::sync::Arc;

    fn delivery(payload: &str) -> Delivery {
        Delivery::new(payload.as_bytes().to_vec(), "notifications.listings")
    }

    #[tokio::test]
    async fn test_processor_name_and_health() {
        let dispatcher = EventDispatcher::new(Arc::new(MockEmailSender::new())).unwrap();
        assert_eq!(dispatcher.name(), "notification_dispatcher");
        assert!(dispatcher.health_check().await.unwrap());

        let failing = EventDispatcher::new(Arc::new(MockEmailSender::failing("down"))).unwrap();
        assert!(!failing.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_acknowledged() {
        let sender = MockEmailSender::new();
        let dispatcher = EventDispatcher::new(Arc::new(sender.clone())).unwrap();

        let result = dispatcher
            .process(&delivery("not json"), &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(sender.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_sender_failure_requests_redelivery() {
        let dispatcher =
            EventDispatcher::new(Arc::new(MockEmailSender::failing("smtp down"))).unwrap();

        let err = dispatcher
            .process(
                &delivery(r#"{"eventType":"UserRegistered","data":{"email":"a@x.com"}}"#),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Transient);
        assert!(err.category().is_redeliverable());
    }
}
