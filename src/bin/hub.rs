//! Standalone broadcast hub binary.
//!
//! Accepts plain TCP connections speaking newline-delimited JSON and fans
//! every inbound line out to all other connected clients. Tool processes
//! publish prompts here; human-facing frontends subscribe.

use serde::Deserialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use switchboard::hub::{self, BroadcastHub};
use switchboard::observability::init_tracing;

#[derive(Debug, Deserialize)]
struct HubConfig {
    #[serde(default = "default_addr")]
    addr: String,
}

fn default_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

fn load_config() -> HubConfig {
    match std::fs::read_to_string("config.json") {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
            error!(error = %e, "failed to parse config.json, using defaults");
            HubConfig::default()
        }),
        Err(_) => HubConfig::default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config();
    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %config.addr, "broadcast hub listening");

    let cancel = CancellationToken::new();
    let serve = tokio::spawn(hub::serve(
        Arc::new(BroadcastHub::new()),
        listener,
        cancel.clone(),
    ));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    cancel.cancel();
    let _ = serve.await;
    Ok(())
}
