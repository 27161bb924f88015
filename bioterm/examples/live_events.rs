//! Real-time event monitoring example
//!
//! Listens for attendance punches and button presses for one minute.

use std::time::Duration;

use bioterm::{Client, EventMask};

#[tokio::main]
async fn main() -> bioterm::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    let mut client = Client::udp(ip, 4370);
    client.connect().await?;

    println!("Listening for events for 60 seconds...");

    let mask = EventMask::ATTLOG | EventMask::BUTTON;
    client
        .listen_events(mask, Some(Duration::from_secs(60)), |event| {
            println!("[{}] {:?}", event.received_at, event.kind);
        })
        .await?;

    client.disconnect().await?;

    Ok(())
}
