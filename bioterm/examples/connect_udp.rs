//! UDP connection example (recommended for most terminals)

use bioterm::Client;

#[tokio::main]
async fn main() -> bioterm::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Change to your terminal IP
    let ip = std::env::var("DEVICE_IP").unwrap_or_else(|_| "192.168.1.201".to_string());

    println!("Connecting to {} via UDP...", ip);

    let mut client = Client::udp(ip, 4370);
    client.connect().await?;
    println!("✓ Connected, session {}", client.session_id());

    let version = client.firmware_version().await?;
    println!("✓ Firmware: {}", version);

    let serial = client.serial_number().await?;
    println!("✓ Serial: {}", serial);

    let info = client.memory_info().await?;
    println!("✓ Storage: {}", info);

    let records = client.attendance_log().await?;
    println!("✓ {} attendance records", records.len());
    for record in records.iter().take(10) {
        println!("  {} state={} at {:?}", record.user_id, record.state, record.timestamp);
    }

    client.disconnect().await?;
    println!("✓ Disconnected");

    Ok(())
}
