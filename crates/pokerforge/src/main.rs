//! The `pokerforge` server binary.

use std::time::Duration;

use clap::Parser;
use pokerforge::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pokerforge")]
#[command(about = "Live planning-poker session server over WebSockets")]
#[command(version)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// Seconds between liveness pings
    #[arg(long, default_value_t = 10)]
    ping_interval_secs: u64,

    /// Seconds of silence before a connection is dropped
    #[arg(long, default_value_t = 30)]
    liveness_timeout_secs: u64,

    /// Pushes each connection may have queued
    #[arg(long, default_value_t = 64)]
    outbox_capacity: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            liveness: LivenessConfig {
                ping_interval: Duration::from_secs(self.ping_interval_secs),
                timeout: Duration::from_secs(self.liveness_timeout_secs),
            },
            outbox_capacity: self.outbox_capacity,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), PokerforgeError> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = PokerforgeServer::builder()
        .config(args.into_config())
        .build()
        .await?;

    match server.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "local address unavailable"),
    }

    server.run().await
}
