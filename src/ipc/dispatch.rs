//! Request dispatch seam shared by the orchestrator surface and tool adapters.

use crate::router::ToolRouter;
use crate::types::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Service name of the orchestrator's public surface.
pub const ORCHESTRATOR_SERVICE: &str = "orchestrator";

/// Handles one decoded request. The server is generic over this so the same
/// transport fronts both the orchestrator and every tool adapter process.
#[async_trait]
pub trait Dispatch: Send + Sync + 'static {
    async fn dispatch(&self, service: &str, method: &str, body: Value) -> Result<Value>;
}

/// Extract a required string field from a request body.
pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::invalid_argument(format!("Missing required field: {}", key)))
}

/// Routes `orchestrator` service methods to the [`ToolRouter`].
#[derive(Debug)]
pub struct OrchestratorDispatch {
    router: Arc<ToolRouter>,
}

impl OrchestratorDispatch {
    pub fn new(router: Arc<ToolRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Dispatch for OrchestratorDispatch {
    async fn dispatch(&self, service: &str, method: &str, body: Value) -> Result<Value> {
        if service != ORCHESTRATOR_SERVICE {
            return Err(Error::not_found(format!("Unknown service: {}", service)));
        }

        match method {
            "ListTools" => {
                let tools = self.router.list_tools().await;
                let count = tools.len();
                Ok(serde_json::json!({
                    "tools": tools,
                    "count": count,
                }))
            }

            "ExecuteTool" => {
                let tool_name = str_field(&body, "tool_name")?;
                let task_id = body
                    .get("task_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = body
                    .get("arguments")
                    .cloned()
                    .unwrap_or(Value::Object(serde_json::Map::new()));

                let outcome = self
                    .router
                    .execute_tool(&tool_name, &task_id, arguments)
                    .await?;
                Ok(serde_json::to_value(outcome)?)
            }

            "ProvideHumanInput" => {
                let task_id = body
                    .get("task_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let response = body.get("response").cloned().unwrap_or(Value::Null);

                let ack = self.router.provide_human_input(&task_id, response).await?;
                Ok(serde_json::to_value(ack)?)
            }

            "GetHumanInput" => {
                let task_id = body
                    .get("task_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();

                let answer = self.router.get_human_input(&task_id).await?;
                Ok(serde_json::to_value(answer)?)
            }

            _ => Err(Error::not_found(format!(
                "Unknown orchestrator method: {}",
                method
            ))),
        }
    }
}
