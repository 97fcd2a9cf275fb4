//! Human-input task store.
//!
//! Decouples a synchronous caller from an out-of-band human responder: a
//! task is published once, the answer can arrive arbitrarily late, and any
//! caller retrieves it by correlation id. State is volatile — nothing
//! survives a restart.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::types::{Error, Result, TaskStoreConfig};

/// Lifecycle state of one human-input task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Completed,
}

#[derive(Debug, Clone)]
struct HumanTask {
    state: TaskState,
    response: Option<Value>,
    updated_at: DateTime<Utc>,
}

/// Poll result for one task id.
#[derive(Debug, Clone, Serialize)]
pub struct TaskAnswer {
    pub status: TaskState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// In-memory map from task id to its state, guarded by a single lock that
/// is never held across an await. Completed entries are evicted by the
/// retention sweep; pending entries are kept indefinitely so an operator
/// can still answer late.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, HumanTask>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the human's answer for `task_id`. Unconditionally overwrites
    /// or creates the entry as completed: resubmission simply re-sets the
    /// same state, and of two different answers the second wins.
    pub async fn provide(&self, task_id: &str, response: Value) -> Result<()> {
        if task_id.is_empty() {
            return Err(Error::invalid_argument("task_id cannot be empty"));
        }

        let mut tasks = self.tasks.write().await;
        tasks.insert(
            task_id.to_string(),
            HumanTask {
                state: TaskState::Completed,
                response: Some(response),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Non-blocking read of a task's answer. An unknown id is reported as
    /// pending, not as an error: the answer may simply not exist yet.
    pub async fn get(&self, task_id: &str) -> Result<TaskAnswer> {
        if task_id.is_empty() {
            return Err(Error::invalid_argument("task_id cannot be empty"));
        }

        let tasks = self.tasks.read().await;
        match tasks.get(task_id) {
            Some(task) if task.state == TaskState::Completed => Ok(TaskAnswer {
                status: TaskState::Completed,
                response: task.response.clone(),
            }),
            _ => Ok(TaskAnswer {
                status: TaskState::Pending,
                response: None,
            }),
        }
    }

    /// Number of tracked tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    /// Evict completed tasks older than `retention`. Returns the eviction
    /// count.
    pub async fn evict_completed(&self, retention: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, task| task.state != TaskState::Completed || task.updated_at >= cutoff);
        before - tasks.len()
    }
}

/// Start the periodic retention sweep. Returns immediately; eviction runs in
/// a spawned task until the token is cancelled.
pub fn start_retention_sweep(
    store: Arc<TaskStore>,
    config: TaskStoreConfig,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.sweep_interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = store.evict_completed(config.retention).await;
                    if evicted > 0 {
                        tracing::info!(evicted, "evicted expired completed tasks");
                    }
                }
                _ = cancel.cancelled() => {
                    tracing::info!("task retention sweep stopped");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_task_is_pending_not_error() {
        let store = TaskStore::new();
        let answer = store.get("never-created").await.unwrap();
        assert_eq!(answer.status, TaskState::Pending);
        assert!(answer.response.is_none());
    }

    #[tokio::test]
    async fn empty_task_id_rejected_on_both_paths() {
        let store = TaskStore::new();
        assert!(matches!(
            store.provide("", json!("yes")).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(store.get("").await, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn provide_then_get_observes_completed() {
        let store = TaskStore::new();
        store.provide("task-1", json!("approved")).await.unwrap();

        let answer = store.get("task-1").await.unwrap();
        assert_eq!(answer.status, TaskState::Completed);
        assert_eq!(answer.response, Some(json!("approved")));
    }

    #[tokio::test]
    async fn provide_is_idempotent_last_write_wins() {
        let store = TaskStore::new();
        store.provide("task-1", json!("yes")).await.unwrap();
        store.provide("task-1", json!("yes")).await.unwrap();
        assert_eq!(
            store.get("task-1").await.unwrap().response,
            Some(json!("yes"))
        );

        store.provide("task-1", json!("no")).await.unwrap();
        let answer = store.get("task-1").await.unwrap();
        assert_eq!(answer.status, TaskState::Completed);
        assert_eq!(answer.response, Some(json!("no")));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn eviction_only_touches_old_completed_tasks() {
        let store = TaskStore::new();
        store.provide("old-completed", json!("done")).await.unwrap();

        // Zero retention: every completed task is already expired.
        let evicted = store.evict_completed(Duration::from_secs(0)).await;
        assert_eq!(evicted, 1);
        assert!(store.is_empty().await);

        // A fresh completion survives a generous retention window.
        store.provide("fresh", json!("done")).await.unwrap();
        assert_eq!(store.evict_completed(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.len().await, 1);
    }
}
