//! Process supervisor — discovers tool processes, launches them, dials them
//! with bounded retry, and registers them under their self-reported names.
//!
//! Discovery failures are recovered locally: a tool that cannot be launched
//! or reached simply never appears in the registry. Startup proceeds with
//! whatever subset came up.

pub mod monitor;

use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::ipc::IpcClient;
use crate::registry::{HealthStatus, RegisteredTool, ToolRegistry};
use crate::types::{DiscoveryConfig, Error, Result, RetryPolicy};

/// One launchable tool candidate: where it lives, how to start it, and
/// where it will listen once up.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    /// Directory the tool runs in. Also the source of `name_hint`.
    pub dir: PathBuf,
    /// Directory-derived name, used only for logging until the tool reports
    /// its authoritative name.
    pub name_hint: String,
    /// Port the tool listens on (always on loopback).
    pub port: u16,
    /// Launch command; empty means the tool is managed externally and only
    /// needs to be dialed.
    pub command: Vec<String>,
}

/// An enumerable source of tool launch specifications. The filesystem walk
/// is one provider; tests substitute their own.
pub trait DiscoverySource: Send + Sync {
    fn launch_specs(&self) -> Vec<LaunchSpec>;
}

/// Per-tool launch descriptor, read from `config.json` in the tool's
/// directory.
#[derive(Debug, Deserialize)]
struct ToolLaunchFile {
    port: u16,
    #[serde(default)]
    command: Vec<String>,
}

/// Filesystem discovery provider: enumerates immediate subdirectories of
/// each root as tool candidates.
#[derive(Debug)]
pub struct DirScanner {
    roots: Vec<PathBuf>,
    denylist: HashSet<String>,
}

impl DirScanner {
    pub fn new(roots: Vec<PathBuf>, denylist: impl IntoIterator<Item = String>) -> Self {
        Self {
            roots,
            denylist: denylist.into_iter().collect(),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.roots.clone(), config.denylist.iter().cloned())
    }

    fn scan_candidate(&self, dir: &Path) -> Option<LaunchSpec> {
        let name_hint = dir.file_name()?.to_string_lossy().to_string();
        if self.denylist.contains(&name_hint) {
            tracing::warn!(tool = %name_hint, "skipping denylisted tool");
            return None;
        }

        let config_path = dir.join("config.json");
        let raw = match std::fs::read_to_string(&config_path) {
            Ok(raw) => raw,
            Err(_) => {
                tracing::warn!(tool = %name_hint, "config.json not found for tool, skipping");
                return None;
            }
        };
        let launch: ToolLaunchFile = match serde_json::from_str(&raw) {
            Ok(launch) => launch,
            Err(e) => {
                tracing::warn!(tool = %name_hint, error = %e, "failed to parse tool config.json, skipping");
                return None;
            }
        };

        Some(LaunchSpec {
            dir: dir.to_path_buf(),
            name_hint,
            port: launch.port,
            command: launch.command,
        })
    }
}

impl DiscoverySource for DirScanner {
    fn launch_specs(&self) -> Vec<LaunchSpec> {
        let mut specs = Vec::new();
        for root in &self.roots {
            let entries = match std::fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(root = %root.display(), error = %e, "cannot access tool directory, skipping");
                    continue;
                }
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    if let Some(spec) = self.scan_candidate(&path) {
                        specs.push(spec);
                    }
                }
            }
        }
        specs
    }
}

/// Owns the spawned tool processes and the connect-with-retry policy. The
/// sole holder of child handles; `shutdown` is the only place they are
/// terminated.
#[derive(Debug)]
pub struct Supervisor {
    registry: Arc<ToolRegistry>,
    retry: RetryPolicy,
    children: Mutex<Vec<Child>>,
}

impl Supervisor {
    pub fn new(registry: Arc<ToolRegistry>, retry: RetryPolicy) -> Self {
        Self {
            registry,
            retry,
            children: Mutex::new(Vec::new()),
        }
    }

    /// Discover and register every tool the source yields. Invoked once at
    /// startup, before the service accepts calls; re-discovery is a
    /// restart-time operation.
    pub async fn discover(&self, source: &dyn DiscoverySource) {
        let specs = source.launch_specs();
        tracing::info!(candidates = specs.len(), "starting tool discovery and launch");

        for spec in specs {
            if !spec.command.is_empty() {
                if let Err(e) = self.spawn(&spec).await {
                    tracing::error!(tool = %spec.name_hint, error = %e, "failed to start tool");
                    continue;
                }
            }
            if let Err(e) = self.connect_and_register(&spec).await {
                tracing::error!(tool = %spec.name_hint, error = %e, "giving up on tool");
            }
        }

        tracing::info!(registered = self.registry.len().await, "tool discovery finished");
    }

    async fn spawn(&self, spec: &LaunchSpec) -> Result<()> {
        let mut command = Command::new(&spec.command[0]);
        command
            .args(&spec.command[1..])
            .current_dir(&spec.dir)
            // Tool output goes to the operator's console.
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = command.spawn()?;
        tracing::info!(tool = %spec.name_hint, pid = child.id(), "started tool process");
        self.children.lock().await.push(child);
        Ok(())
    }

    /// Dial the tool and fetch its self-description, retrying up to the
    /// configured bound to tolerate slow cold starts (tools compiled or
    /// interpreted on first launch). One attempt = sleep, dial, describe.
    async fn connect_and_register(&self, spec: &LaunchSpec) -> Result<()> {
        let addr: SocketAddr = format!("127.0.0.1:{}", spec.port)
            .parse()
            .map_err(|e| Error::internal(format!("bad tool address: {}", e)))?;
        let client = IpcClient::new(addr);

        let mut last_err = Error::internal("no connection attempts made");
        let mut descriptor = None;
        for attempt in 1..=self.retry.max_attempts {
            tokio::time::sleep(self.retry.delay).await;
            match client.describe(self.retry.describe_timeout).await {
                Ok(desc) => {
                    descriptor = Some(desc);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        tool = %spec.name_hint,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "failed to reach tool, retrying",
                    );
                    last_err = e;
                }
            }
        }
        let descriptor = descriptor.ok_or(last_err)?;

        // The self-reported name is authoritative over the directory name.
        if descriptor.name.is_empty() {
            tracing::warn!(tool = %spec.name_hint, "tool provided an empty name, skipping");
            return Err(Error::invalid_argument("tool reported an empty name"));
        }
        let name = descriptor.name.clone();

        // A tool must prove health, not be assumed healthy.
        let status = match client.health_check(self.retry.describe_timeout).await {
            Ok(status) => {
                tracing::info!(tool = %name, ?status, "initial health check succeeded");
                status
            }
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "initial health check failed");
                HealthStatus::NotServing
            }
        };

        self.registry
            .insert(RegisteredTool {
                descriptor,
                addr,
                status,
            })
            .await;
        tracing::info!(tool = %name, %addr, "registered tool");
        Ok(())
    }

    /// Kill every process this supervisor spawned. Called once at
    /// orchestrator shutdown.
    pub async fn shutdown(&self) {
        let mut children = self.children.lock().await;
        tracing::info!(count = children.len(), "terminating tool subprocesses");
        for child in children.iter_mut() {
            let pid = child.id();
            match child.start_kill() {
                Ok(()) => tracing::info!(?pid, "killed tool process"),
                Err(e) => tracing::error!(?pid, error = %e, "failed to kill tool process"),
            }
        }
        for child in children.iter_mut() {
            let _ = child.wait().await;
        }
        children.clear();
    }
}
