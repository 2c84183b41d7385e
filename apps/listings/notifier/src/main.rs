//! Listings notification worker
//!
//! Binary entry point for the NATS-based notification worker.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    core_config::tracing::install_color_eyre();
    listings_notifier::run().await
}
