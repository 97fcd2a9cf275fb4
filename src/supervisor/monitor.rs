//! Background health monitor.
//!
//! Re-polls every registered tool on a fixed tick and rewrites statuses in
//! place. An unreachable tool is demoted to NOT_SERVING, never removed, so
//! it can recover on a later tick without re-discovery.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ipc::IpcClient;
use crate::registry::{HealthStatus, ToolRegistry};
use crate::types::HealthConfig;

/// Periodic health sweeper over a shared registry.
#[derive(Debug)]
pub struct HealthMonitor {
    registry: Arc<ToolRegistry>,
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ToolRegistry>, config: HealthConfig) -> Self {
        Self { registry, config }
    }

    /// Run sweeps until the token is cancelled. Returns immediately; the
    /// loop runs in a spawned task.
    pub fn start(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep().await;
                    }
                    _ = cancel.cancelled() => {
                        tracing::info!("stopping health checks");
                        break;
                    }
                }
            }
        })
    }

    /// One full sweep under the registry's exclusive lock. Sweep cost is
    /// bounded: per-call timeout × registered tools.
    pub async fn sweep(&self) {
        let mut tools = self.registry.sweep_guard().await;
        for (name, tool) in tools.iter_mut() {
            let observed = match IpcClient::new(tool.addr)
                .health_check(self.config.check_timeout)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(tool = %name, error = %e, "health check failed");
                    HealthStatus::NotServing
                }
            };
            // Log on transition only, to keep a steady state quiet.
            if tool.status != observed {
                tracing::info!(tool = %name, from = ?tool.status, to = ?observed, "health status changed");
            }
            tool.status = observed;
        }
    }
}
