//! Publish a sample event for the notification worker
//!
//! Run with: cargo run -p listings_notifier --example publish_event [EventType]

use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let nats_url =
        std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string());
    let event_type = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "ApplicationCreated".to_string());

    println!("Connecting to NATS at {}...", nats_url);
    let client = async_nats::connect(&nats_url).await?;
    let jetstream = async_nats::jetstream::new(client);

    let data = match event_type.as_str() {
        "UserRegistered" => json!({ "email": "applicant@example.com" }),
        "ListingCreated" => json!({
            "ownerEmail": "owner@example.com",
            "title": "Sunny Loft",
            "location": "Berlin",
            "price": 1200,
        }),
        _ => json!({
            "applicantEmail": "applicant@example.com",
            "ownerEmail": "owner@example.com",
            "listingTitle": "Sunny Loft",
        }),
    };

    let payload = serde_json::to_vec(&json!({
        "eventType": event_type,
        "data": data,
        "enqueuedAt": "2026-02-11T00:00:00Z",
    }))?;

    let subject = format!("notifications.{}", event_type.to_lowercase());
    let ack = jetstream.publish(subject.clone(), payload.into()).await?.await?;

    println!("Published {} to {} (sequence {})", event_type, subject, ack.sequence);
    println!("\nCheck the worker logs and Mailpit at http://localhost:8025");

    Ok(())
}
