//! Orchestrator entry point.
//!
//! Boot order: load config, discover and launch tools, start the health
//! monitor and task retention sweep, then serve the RPC and HTTP surfaces
//! until SIGINT/SIGTERM. Shutdown reverses that order and kills the
//! supervised tool processes last.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use switchboard::broker::{self, TaskStore};
use switchboard::gateway;
use switchboard::ipc::dispatch::OrchestratorDispatch;
use switchboard::ipc::IpcServer;
use switchboard::observability::init_tracing;
use switchboard::registry::ToolRegistry;
use switchboard::router::ToolRouter;
use switchboard::supervisor::monitor::HealthMonitor;
use switchboard::supervisor::{DirScanner, Supervisor};
use switchboard::types::Config;

const CONFIG_PATH: &str = "config.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(CONFIG_PATH);
    let rpc_addr: SocketAddr = config.server.rpc_addr.parse()?;
    let http_addr: SocketAddr = config.server.http_addr.parse()?;

    let registry = Arc::new(ToolRegistry::new());
    let tasks = Arc::new(TaskStore::new());
    let router = Arc::new(ToolRouter::new(registry.clone(), tasks.clone()));

    // Launch and register every discoverable tool before accepting traffic.
    let supervisor = Supervisor::new(registry.clone(), config.discovery.retry.clone());
    let scanner = DirScanner::from_config(&config.discovery);
    supervisor.discover(&scanner).await;
    info!(tools = registry.len().await, "tool discovery complete");

    let cancel = CancellationToken::new();

    let monitor =
        HealthMonitor::new(registry.clone(), config.health.clone()).start(cancel.clone());
    let retention =
        broker::start_retention_sweep(tasks.clone(), config.task_store.clone(), cancel.clone());

    let rpc_server = Arc::new(IpcServer::new(
        Arc::new(OrchestratorDispatch::new(router.clone())),
        rpc_addr,
        config.ipc.clone(),
    ));
    let rpc_task = tokio::spawn({
        let rpc_server = rpc_server.clone();
        async move {
            if let Err(e) = rpc_server.serve().await {
                error!(error = %e, "rpc server exited with error");
            }
        }
    });

    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_task = tokio::spawn(gateway::serve(router, http_listener, cancel.clone()));

    wait_for_shutdown_signal().await;
    info!("shutdown signal received");

    // Stop accepting new work first, then background loops, then children.
    rpc_server.shutdown();
    cancel.cancel();
    let _ = rpc_task.await;
    let _ = http_task.await;
    let _ = monitor.await;
    let _ = retention.await;
    supervisor.shutdown().await;

    info!("shutdown complete");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let sigint = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                let _ = sigint.await;
                return;
            }
        };
        tokio::select! {
            _ = sigint => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = sigint.await;
    }
}
