//! Tool registry — the in-memory directory of known tools and their health.
//!
//! Owned store type, internally synchronized; handed around by `Arc` rather
//! than living in ambient global state. The supervisor populates it, the
//! router reads it, the health monitor rewrites statuses in place.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::sync::{RwLock, RwLockWriteGuard};

/// Binary health classification per tool, independent of process liveness
/// (a live but overloaded tool may self-report NOT_SERVING).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Serving,
    NotServing,
    Unknown,
}

/// A single parameter accepted by a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A tool's self-description. The name is assigned by the tool itself and is
/// authoritative over any directory-derived name. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// Declaration order is preserved.
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
}

/// A registered tool: its description, where to reach it, and the last
/// health status the monitor observed.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub descriptor: ToolDescriptor,
    pub addr: SocketAddr,
    pub status: HealthStatus,
}

/// In-memory mapping from tool name to registered tool. At most one entry
/// per name; the last successful discovery for a name wins. Entries are
/// never removed during normal operation — a permanently failing tool stays
/// NOT_SERVING and is simply excluded from listings.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a tool under its self-reported name.
    pub async fn insert(&self, tool: RegisteredTool) {
        let name = tool.descriptor.name.clone();
        let mut tools = self.tools.write().await;
        if tools.insert(name.clone(), tool).is_some() {
            tracing::warn!(tool = %name, "replaced existing registry entry");
        }
    }

    /// Descriptors of tools currently marked SERVING. Iteration order of the
    /// snapshot is unspecified; callers must not assume stability.
    pub async fn serving_descriptors(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().await;
        tools
            .values()
            .filter(|t| t.status == HealthStatus::Serving)
            .map(|t| t.descriptor.clone())
            .collect()
    }

    /// Address of a tool if it exists and is SERVING.
    pub async fn serving_addr(&self, name: &str) -> Option<SocketAddr> {
        let tools = self.tools.read().await;
        tools
            .get(name)
            .filter(|t| t.status == HealthStatus::Serving)
            .map(|t| t.addr)
    }

    /// Whether any entry exists under `name`, healthy or not.
    pub async fn contains(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// Current status of a named tool.
    pub async fn status(&self, name: &str) -> Option<HealthStatus> {
        self.tools.read().await.get(name).map(|t| t.status)
    }

    /// Number of registered tools, healthy or not.
    pub async fn len(&self) -> usize {
        self.tools.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tools.read().await.is_empty()
    }

    /// Exclusive access for the health monitor's sweep. The guard is held
    /// for the duration of one full sweep, which is bounded by
    /// per-call-timeout × registered tools.
    pub(crate) async fn sweep_guard(
        &self,
    ) -> RwLockWriteGuard<'_, HashMap<String, RegisteredTool>> {
        self.tools.write().await
    }
}
