//! Human-input tool binary.
//!
//! Serves the standard tool contract on its configured port. Each Run call
//! publishes the prompt to the broadcast hub and returns a task id the
//! caller polls through the orchestrator.

use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use switchboard::adapter::human_input::HumanInputTool;
use switchboard::adapter::{ServingFlag, ToolService};
use switchboard::hub::HubPublisher;
use switchboard::observability::init_tracing;
use switchboard::types::IpcConfig;

#[derive(Debug, Deserialize)]
struct ToolConfig {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    broker: BrokerConfig,
}

#[derive(Debug, Deserialize)]
struct BrokerConfig {
    #[serde(default = "default_hub_addr")]
    address: String,
}

fn default_port() -> u16 {
    8104
}

fn default_hub_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            address: default_hub_addr(),
        }
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            broker: BrokerConfig::default(),
        }
    }
}

fn load_config() -> ToolConfig {
    match std::fs::read_to_string("config.json") {
        Ok(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        Err(_) => ToolConfig::default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = load_config();
    let addr: SocketAddr = format!("127.0.0.1:{}", config.port).parse()?;
    info!(%addr, hub = %config.broker.address, "human-input tool starting");

    let tool = Arc::new(HumanInputTool::new(HubPublisher::new(
        config.broker.address,
    )));
    let server = ToolService::new(tool, ServingFlag::serving())
        .into_server(addr, IpcConfig::default());

    let cancel = server.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    server.serve().await?;
    Ok(())
}
