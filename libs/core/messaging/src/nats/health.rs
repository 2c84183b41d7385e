//! Health endpoints for K8s probes.

use crate::Processor;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Health status of the worker.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub stream_connected: bool,
    pub processor_healthy: bool,
}

/// Shared health state, updated by the worker and read by the probes.
#[derive(Clone)]
pub struct HealthState {
    inner: Arc<RwLock<HealthStateInner>>,
}

struct HealthStateInner {
    stream_connected: bool,
    processor_healthy: bool,
    last_error: Option<String>,
}

impl HealthState {
    /// Create new health state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HealthStateInner {
                stream_connected: true,
                processor_healthy: true,
                last_error: None,
            })),
        }
    }

    /// Mark stream as connected.
    pub async fn set_stream_connected(&self, connected: bool) {
        self.inner.write().await.stream_connected = connected;
    }

    /// Mark processor (and its downstream services) as healthy.
    pub async fn set_processor_healthy(&self, healthy: bool) {
        self.inner.write().await.processor_healthy = healthy;
    }

    /// Set last error.
    pub async fn set_error(&self, error: Option<String>) {
        self.inner.write().await.last_error = error;
    }

    /// Check if ready (for readiness).
    ///
    /// Liveness never consults this; neither a NATS disconnection nor a
    /// downstream outage is fixed by restarting the pod.
    pub async fn is_ready(&self) -> bool {
        let inner = self.inner.read().await;
        inner.stream_connected && inner.processor_healthy
    }

    /// Get status.
    pub async fn status(&self) -> HealthStatus {
        let inner = self.inner.read().await;
        let status = if inner.stream_connected && inner.processor_healthy {
            "healthy".to_string()
        } else {
            format!(
                "unhealthy: {}",
                inner.last_error.as_deref().unwrap_or("unknown")
            )
        };

        HealthStatus {
            status,
            stream_connected: inner.stream_connected,
            processor_healthy: inner.processor_healthy,
        }
    }
}

/// Run the processor's health check and record the outcome in `health`.
///
/// A failed check counts as unhealthy. Returns the recorded value.
pub async fn refresh_processor_health<P: Processor + ?Sized>(
    processor: &P,
    health: &HealthState,
) -> bool {
    let healthy = match processor.health_check().await {
        Ok(true) => true,
        Ok(false) => {
            warn!(processor = processor.name(), "Processor reported unhealthy");
            false
        }
        Err(e) => {
            warn!(processor = processor.name(), error = %e, "Processor health check failed");
            false
        }
    };

    health.set_processor_healthy(healthy).await;
    if !healthy {
        health
            .set_error(Some(format!("{} unhealthy", processor.name())))
            .await;
    }
    healthy
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Health server for K8s probes.
pub struct HealthServer {
    port: u16,
    state: HealthState,
    metrics_handle: Option<PrometheusHandle>,
}

impl HealthServer {
    /// Create a new health server.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            state: HealthState::new(),
            metrics_handle: None,
        }
    }

    /// Set the metrics handle for /metrics endpoint.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }

    /// Get the health state for updates.
    pub fn state(&self) -> HealthState {
        self.state.clone()
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/healthz", get(health_handler))
            .route("/ready", get(ready_handler))
            .route("/readyz", get(ready_handler))
            .with_state(self.state.clone());

        if let Some(handle) = self.metrics_handle.clone() {
            router = router.route(
                "/metrics",
                get(move || {
                    let handle = handle.clone();
                    async move { handle.render() }
                }),
            );
        }

        router.layer(TraceLayer::new_for_http())
    }

    /// Run the health server until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let router = self.router();
        let addr = format!("0.0.0.0:{}", self.port);

        info!(addr = %addr, "Starting health server");

        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        Ok(())
    }
}

/// Liveness probe handler. Answers as long as the process serves requests.
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.status().await))
}

/// Readiness probe handler.
async fn ready_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let status = state.status().await;
    if state.is_ready().await {
        (StatusCode::OK, Json(status))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn probe(router: Router, path: &str) -> StatusCode {
        router
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_probes_healthy_by_default() {
        let server = HealthServer::new(0);
        assert_eq!(probe(server.router(), "/healthz").await, StatusCode::OK);
        assert_eq!(probe(server.router(), "/readyz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stream_disconnect_only_fails_readiness() {
        let server = HealthServer::new(0);
        let state = server.state();
        state.set_stream_connected(false).await;
        state.set_error(Some("connection reset".to_string())).await;

        assert_eq!(probe(server.router(), "/health").await, StatusCode::OK);
        assert_eq!(
            probe(server.router(), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(state.status().await.status, "unhealthy: connection reset");
    }

    #[tokio::test]
    async fn test_unhealthy_processor_fails_readiness_only() {
        let server = HealthServer::new(0);
        server.state().set_processor_healthy(false).await;

        assert_eq!(probe(server.router(), "/healthz").await, StatusCode::OK);
        assert_eq!(
            probe(server.router(), "/readyz").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    struct Downstream(Result<bool, ()>);

    #[async_trait::async_trait]
    impl Processor for Downstream {
        async fn process(
            &self,
            _delivery: &crate::Delivery,
            _cancel: &CancellationToken,
        ) -> Result<(), crate::ProcessingError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "downstream"
        }

        async fn health_check(&self) -> Result<bool, crate::ProcessingError> {
            self.0
                .map_err(|()| crate::ProcessingError::transient("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_processor_health_drives_readiness() {
        let server = HealthServer::new(0);
        let state = server.state();

        assert!(!refresh_processor_health(&Downstream(Ok(false)), &state).await);
        assert_eq!(
            probe(server.router(), "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(state.status().await.status, "unhealthy: downstream unhealthy");

        assert!(!refresh_processor_health(&Downstream(Err(())), &state).await);
        assert!(!state.is_ready().await);

        assert!(refresh_processor_health(&Downstream(Ok(true)), &state).await);
        assert_eq!(probe(server.router(), "/ready").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics_route_absent_without_handle() {
        let server = HealthServer::new(0);
        assert_eq!(probe(server.router(), "/metrics").await, StatusCode::NOT_FOUND);
    }
}
