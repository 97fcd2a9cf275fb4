//! Human-input tool: publishes a prompt to the broadcast hub and returns
//! a task handle immediately. The answer arrives later, out of band,
//! through the orchestrator's ProvideHumanInput path.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::hub::{HubMessage, HubPublisher};
use crate::registry::{ParamSpec, ToolDescriptor};

use super::{RunOutcome, Tool};

/// Registration name reported by [`Tool::descriptor`].
pub const HUMAN_INPUT_TOOL_NAME: &str = "human_input";

#[derive(Debug)]
pub struct HumanInputTool {
    publisher: HubPublisher,
}

impl HumanInputTool {
    pub fn new(publisher: HubPublisher) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl Tool for HumanInputTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: HUMAN_INPUT_TOOL_NAME.to_string(),
            description: "Asks a human a question and returns a task id to poll for the answer"
                .to_string(),
            parameters: vec![ParamSpec {
                name: "prompt".to_string(),
                param_type: "string".to_string(),
                description: "Question to put to the human".to_string(),
                required: true,
            }],
        }
    }

    async fn run(&self, arguments: Map<String, Value>) -> RunOutcome {
        let prompt = match arguments.get("prompt").and_then(|v| v.as_str()) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                return RunOutcome::Failure(
                    "Invalid or missing 'prompt' argument".to_string(),
                )
            }
        };

        let task_id = uuid::Uuid::new_v4().to_string();
        let message = HubMessage {
            task_id: task_id.clone(),
            prompt,
        };

        if let Err(err) = self.publisher.publish(&message).await {
            warn!(task_id = %task_id, error = %err, "failed to publish prompt to hub");
            return RunOutcome::Failure(format!("could not reach human-input hub: {}", err));
        }

        info!(task_id = %task_id, "prompt published, awaiting human response");
        RunOutcome::Success(json!({
            "status": "waiting_for_human",
            "task_id": task_id,
        }))
    }
}
