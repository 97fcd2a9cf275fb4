//! Request router — the orchestrator's public service.
//!
//! Looks tools up in the registry, forwards calls, and normalizes result
//! envelopes. The human-input operations are served directly from the task
//! store; the registry lock and the task-store lock are never held by one
//! operation.

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::broker::{TaskAnswer, TaskStore};
use crate::ipc::IpcClient;
use crate::registry::{ToolDescriptor, ToolRegistry};
use crate::types::{Error, Result};

/// Normalized result of one tool execution. `result` is always a keyed
/// structure: scalar and list outputs are wrapped under a `"result"` key.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteOutcome {
    pub task_id: String,
    pub result: Map<String, Value>,
}

/// Acknowledgement for a stored human answer.
#[derive(Debug, Clone, Serialize)]
pub struct ProvideAck {
    pub status: &'static str,
}

/// The orchestrator's public service.
#[derive(Debug)]
pub struct ToolRouter {
    registry: Arc<ToolRegistry>,
    tasks: Arc<TaskStore>,
}

impl ToolRouter {
    pub fn new(registry: Arc<ToolRegistry>, tasks: Arc<TaskStore>) -> Self {
        Self { registry, tasks }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn tasks(&self) -> &Arc<TaskStore> {
        &self.tasks
    }

    /// Descriptors of currently healthy tools. Order is a registry snapshot
    /// and carries no stability guarantee.
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.registry.serving_descriptors().await
    }

    /// Execute `tool_name` with `arguments`, correlated by `task_id`.
    ///
    /// Failure taxonomy, distinguishable by the caller:
    /// - unknown or unhealthy tool → [`Error::NotFound`]
    /// - transport failure reaching the tool → [`Error::Internal`]
    /// - tool reachable but reporting an error string → [`Error::Aborted`]
    pub async fn execute_tool(
        &self,
        tool_name: &str,
        task_id: &str,
        arguments: Value,
    ) -> Result<ExecuteOutcome> {
        tracing::info!(tool = tool_name, task_id, "executing tool");

        let addr = self.registry.serving_addr(tool_name).await.ok_or_else(|| {
            tracing::warn!(tool = tool_name, task_id, "attempt to run unavailable tool");
            Error::not_found(format!("Tool '{}' not found or is not healthy", tool_name))
        })?;

        // No additional deadline here: the caller's own cancellation context
        // governs the forwarded call.
        let reply = IpcClient::new(addr).run(arguments).await.map_err(|e| {
            tracing::error!(tool = tool_name, task_id, error = %e, "call to tool failed");
            Error::internal(format!("call to tool '{}' failed: {}", tool_name, e))
        })?;

        if !reply.error.is_empty() {
            tracing::error!(tool = tool_name, task_id, error = %reply.error, "tool returned an error");
            return Err(Error::aborted(format!(
                "Tool '{}' returned an error: {}",
                tool_name, reply.error
            )));
        }

        Ok(ExecuteOutcome {
            task_id: task_id.to_string(),
            result: normalize_result(reply.result),
        })
    }

    /// Store the human's answer for a task. Idempotent; last write wins.
    pub async fn provide_human_input(&self, task_id: &str, response: Value) -> Result<ProvideAck> {
        tracing::info!(task_id, "received human input");
        self.tasks.provide(task_id, response).await?;
        Ok(ProvideAck { status: "received" })
    }

    /// Non-blocking poll for a task's answer.
    pub async fn get_human_input(&self, task_id: &str) -> Result<TaskAnswer> {
        tracing::debug!(task_id, "checking for human input");
        self.tasks.get(task_id).await
    }
}

/// Wrap non-object tool results so every successful response has a uniform
/// structured envelope regardless of what the tool returned.
fn normalize_result(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
    }
}
