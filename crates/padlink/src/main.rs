//! The relay server binary.
//!
//! Configuration comes from the environment: `PADLINK_ADDR` for the
//! bind address (defaults to the kiosk's conventional port 3001) and
//! `RUST_LOG` for log filtering.

use padlink::PadlinkServer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("PADLINK_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3001".to_string());

    let server = PadlinkServer::builder().bind(&addr).build().await?;
    tracing::info!(addr = %server.local_addr()?, "padlink relay listening");

    server.run().await?;
    Ok(())
}
