//! Listings Notification Worker (NATS JetStream)
//!
//! A background worker that turns listing-platform events into emails.
//!
//! ## Architecture
//!
//! ```text
//! NATS JetStream (NOTIFICATIONS stream)
//!   ↓ (Pull Consumer: notifications-worker)
//! NatsWorker<EventDispatcher>
//!   ↓ (routes by eventType, renders copy)
//! TemplateEngine (Handlebars)
//!   ↓
//! EmailSender (SendGrid/SMTP/log)
//! ```
//!
//! Malformed or unknown events are acknowledged and dropped. Failed sends
//! are NAKed so JetStream redelivers them, up to the stream's `max_deliver`.

use core_config::nats::NatsConfig;
use core_config::worker::WorkerSettings;
use core_config::{app_info, Environment, FromEnv};
use email_dispatch::{sender_from_env, EventDispatcher, NotificationStream, ProviderKind, SenderConfig};
use eyre::{Result, WrapErr};
use messaging::nats::{init_metrics, HealthServer, NatsWorker, WorkerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const REPORT_INTERVAL: Duration = Duration::from_secs(15);

/// Run the notification worker until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if:
/// - `EMAIL_FROM_ADDRESS` (or any other setting) is missing or invalid
/// - the email provider cannot be configured
/// - NATS or JetStream is unreachable
pub async fn run() -> Result<()> {
    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);

    let app_info = app_info!();
    info!(
        name = %app_info.name,
        version = %app_info.version,
        environment = ?environment,
        "Starting listings notification worker"
    );

    // Configuration problems abort startup, never individual messages.
    let sender_config = SenderConfig::from_env().wrap_err("Invalid sender configuration")?;
    let nats_config = NatsConfig::from_env().wrap_err("Invalid NATS configuration")?;
    let settings = WorkerSettings::from_env().wrap_err("Invalid worker configuration")?;
    let provider = ProviderKind::from_env(&environment).wrap_err("Invalid EMAIL_PROVIDER")?;

    let sender = sender_from_env(provider, sender_config.clone())
        .wrap_err_with(|| format!("Failed to configure {provider} email provider"))?;
    info!(
        provider = sender.name(),
        from = %sender_config.from_email,
        "Email provider configured"
    );

    let dispatcher =
        EventDispatcher::new(sender).wrap_err("Failed to initialize notification templates")?;

    info!(url = %nats_config.url, "Connecting to NATS...");
    let nats_client = async_nats::connect(&nats_config.url)
        .await
        .wrap_err_with(|| format!("Failed to connect to NATS at {}", nats_config.url))?;
    let jetstream = async_nats::jetstream::new(nats_client);

    let worker_config = WorkerConfig::from_stream::<NotificationStream>()
        .with_stream_name(&nats_config.stream)
        .with_subject(&nats_config.subject)
        .with_consumer_name(&nats_config.consumer)
        .with_batch_size(settings.batch_size)
        .with_max_concurrent_jobs(settings.max_concurrency)
        .with_health_port(settings.health_port);

    info!(
        stream = %worker_config.stream_name,
        subject = %worker_config.subject,
        consumer = %worker_config.consumer_name,
        max_concurrent = worker_config.max_concurrent_jobs,
        "Worker configuration loaded"
    );

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let mut health_server = HealthServer::new(settings.health_port);
    match init_metrics() {
        Ok(handle) => health_server = health_server.with_metrics(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder not installed, /metrics disabled"),
    }
    let health = health_server.state();

    let health_shutdown = shutdown.clone();
    let health_task = tokio::spawn(async move {
        if let Err(e) = health_server.run(health_shutdown).await {
            error!(error = %e, "Health server failed");
        }
    });

    let worker = NatsWorker::new(jetstream, dispatcher, worker_config)
        .await
        .wrap_err("Failed to create NATS worker")?
        .with_health(health);
    let worker = Arc::new(worker);

    // An unreachable provider only fails readiness; failed sends are redelivered.
    let report_task = tokio::spawn(report_worker_state(worker.clone(), shutdown.clone()));

    info!("NATS worker created, starting processing...");
    let result = worker.run(shutdown.clone()).await;

    shutdown.cancel();
    let _ = tokio::join!(health_task, report_task);

    result.wrap_err("NATS worker failed")?;
    info!("Listings notification worker stopped");
    Ok(())
}

/// Refresh the stream depth gauge and email provider health until shutdown.
async fn report_worker_state(worker: Arc<NatsWorker<EventDispatcher>>, shutdown: CancellationToken) {
    let mut interval = tokio::time::interval(REPORT_INTERVAL);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = worker.stream_info().await {
                    warn!(error = %e, "Failed to read stream info");
                }
                worker.check_processor().await;
            }
        }
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        shutdown.cancel();
    });
}

/// Wait for a shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, initiating shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, initiating shutdown...");
    }

    Ok(())
}
